// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request command parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const INVALID_VERB: &str = "Invalid request command. Choose from get|set|subscribe|unsubscribe";

const GET_USAGE: &str =
    "Invalid request. Get request should contain device name and optionally its attribute.";

const SET_USAGE: &str = "Device set message should contain device name and attributes and states \
                         space separated (attr1 val1 attr2 val2).";

const SUBSCRIBE_HINT: &str = "Provide a device with its attributes. E.g. subscribe dev attr1 attr2.";

/// A parsed request.
///
/// Token counts include the verb, so `get relay` has two tokens.
///
/// # Examples
///
/// ```
/// use devnotify::protocol::Command;
///
/// let cmd: Command = "set relay ch1 ON ch2 OFF".parse().unwrap();
/// assert_eq!(
///     cmd,
///     Command::Set {
///         device: "relay".to_string(),
///         targets: vec![
///             ("ch1".to_string(), "ON".to_string()),
///             ("ch2".to_string(), "OFF".to_string()),
///         ],
///     }
/// );
///
/// // Odd number of attribute/value tokens
/// assert!("set relay ch1".parse::<Command>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get <device> [<attribute>]`
    Get {
        /// Device to read.
        device: String,
        /// Single attribute to read, or all of them when `None`.
        attribute: Option<String>,
    },

    /// `set <device> <attr1> <val1> [<attr2> <val2> ...]`
    Set {
        /// Device to modify.
        device: String,
        /// Attribute/value pairs in request order.
        targets: Vec<(String, String)>,
    },

    /// `subscribe <device> <attr1> [<attr2> ...]`
    Subscribe {
        /// Device to watch.
        device: String,
        /// Attributes to watch.
        attributes: Vec<String>,
    },

    /// `unsubscribe`; trailing tokens are ignored.
    Unsubscribe,
}

impl Command {
    fn parse_get(tokens: &[&str]) -> Result<Self, Error> {
        match tokens {
            [_, device] => Ok(Self::Get {
                device: (*device).to_string(),
                attribute: None,
            }),
            [_, device, attribute] => Ok(Self::Get {
                device: (*device).to_string(),
                attribute: Some((*attribute).to_string()),
            }),
            _ => Err(Error::InvalidCommand(GET_USAGE.to_string())),
        }
    }

    fn parse_set(tokens: &[&str]) -> Result<Self, Error> {
        if tokens.len() < 4 || tokens.len() % 2 != 0 {
            return Err(Error::InvalidCommand(SET_USAGE.to_string()));
        }
        let targets = tokens[2..]
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();
        Ok(Self::Set {
            device: tokens[1].to_string(),
            targets,
        })
    }

    fn parse_subscribe(tokens: &[&str]) -> Result<Self, Error> {
        match tokens {
            [_] => Err(Error::InvalidCommand(format!(
                "No device provided. {SUBSCRIBE_HINT}"
            ))),
            [_, device] => Err(Error::InvalidCommand(format!(
                "No attributes of device '{device}' provided. {SUBSCRIBE_HINT}"
            ))),
            [_, device, attributes @ ..] => Ok(Self::Subscribe {
                device: (*device).to_string(),
                attributes: attributes.iter().map(ToString::to_string).collect(),
            }),
            [] => Err(Error::InvalidCommand(INVALID_VERB.to_string())),
        }
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.first().copied() {
            Some("get") => Self::parse_get(&tokens),
            Some("set") => Self::parse_set(&tokens),
            Some("subscribe") => Self::parse_subscribe(&tokens),
            Some("unsubscribe") => Ok(Self::Unsubscribe),
            _ => Err(Error::InvalidCommand(INVALID_VERB.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get { device, attribute } => {
                write!(f, "get {device}")?;
                if let Some(attribute) = attribute {
                    write!(f, " {attribute}")?;
                }
                Ok(())
            }
            Self::Set { device, targets } => {
                write!(f, "set {device}")?;
                for (attribute, value) in targets {
                    write!(f, " {attribute} {value}")?;
                }
                Ok(())
            }
            Self::Subscribe { device, attributes } => {
                write!(f, "subscribe {device}")?;
                for attribute in attributes {
                    write!(f, " {attribute}")?;
                }
                Ok(())
            }
            Self::Unsubscribe => f.write_str("unsubscribe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Command, Error> {
        s.parse()
    }

    #[test]
    fn get_device() {
        assert_eq!(
            parse("get relay").unwrap(),
            Command::Get {
                device: "relay".to_string(),
                attribute: None
            }
        );
    }

    #[test]
    fn get_attribute_with_trailing_newline() {
        assert_eq!(
            parse("get relay ch1\n").unwrap(),
            Command::Get {
                device: "relay".to_string(),
                attribute: Some("ch1".to_string())
            }
        );
    }

    #[test]
    fn get_wrong_token_count() {
        assert!(matches!(parse("get"), Err(Error::InvalidCommand(_))));
        assert!(matches!(
            parse("get relay ch1 ch2"),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn set_requires_even_token_count() {
        assert!(matches!(parse("set relay ch1"), Err(Error::InvalidCommand(_))));
        assert!(matches!(parse("set relay"), Err(Error::InvalidCommand(_))));
        assert!(matches!(
            parse("set relay ch1 ON ch2"),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn set_collects_pairs_in_order() {
        let Command::Set { device, targets } = parse("set relay ch2 OFF ch1 ON").unwrap() else {
            panic!("expected set");
        };
        assert_eq!(device, "relay");
        assert_eq!(
            targets,
            vec![
                ("ch2".to_string(), "OFF".to_string()),
                ("ch1".to_string(), "ON".to_string())
            ]
        );
    }

    #[test]
    fn subscribe_without_device() {
        let err = parse("subscribe").unwrap_err();
        assert!(err.to_string().starts_with("No device provided."));
    }

    #[test]
    fn subscribe_without_attributes() {
        let err = parse("subscribe relay").unwrap_err();
        assert!(err.to_string().contains("No attributes of device 'relay'"));
    }

    #[test]
    fn subscribe_attributes() {
        assert_eq!(
            parse("subscribe relay ch1 ch2").unwrap(),
            Command::Subscribe {
                device: "relay".to_string(),
                attributes: vec!["ch1".to_string(), "ch2".to_string()],
            }
        );
    }

    #[test]
    fn unsubscribe_ignores_extra_tokens() {
        assert_eq!(parse("unsubscribe relay ch1").unwrap(), Command::Unsubscribe);
    }

    #[test]
    fn unknown_verb_names_valid_set() {
        let err = parse("toggle relay").unwrap_err();
        assert!(err.to_string().contains("get|set|subscribe|unsubscribe"));
        assert!(parse("").is_err());
        assert!(parse("GET relay").is_err());
    }

    #[test]
    fn display_round_trips_tokens() {
        let cmd = parse("set  relay ch1   ON").unwrap();
        assert_eq!(cmd.to_string(), "set relay ch1 ON");
    }
}
