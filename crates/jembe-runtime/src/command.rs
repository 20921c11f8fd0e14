//! Commands and the partial-request wire format.
//!
//! A partial request body carries the client's view of the page
//! (`components`) and the work it asks for (`commands`). Wire types
//! stay `String`-typed and are converted to validated [`Command`]s
//! before entering the queue.

use jembe_component::{ActionArgs, EventEmit};
use jembe_types::{ExecName, JembeError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated unit of work on the processor queue.
#[derive(Debug, Clone)]
pub enum Command {
    /// Materialise (or re-materialise) an instance.
    Init {
        /// Target exec name.
        target: ExecName,
        /// Explicit init params.
        params: Map<String, Value>,
        /// Keep client-reported state underneath the params; `false`
        /// rebuilds from defaults alone.
        merge_existing: bool,
    },
    /// Invoke a named action.
    Call {
        /// Target exec name.
        target: ExecName,
        /// Action name.
        action: String,
        /// Positional and keyword arguments.
        args: ActionArgs,
    },
    /// Emit an event as if sourced at `source`.
    Emit {
        /// Emitting exec name.
        source: ExecName,
        /// The event to flush.
        emit: EventEmit,
    },
}

impl Command {
    /// The exec name a command operates on.
    #[must_use]
    pub fn target(&self) -> &ExecName {
        match self {
            Self::Init { target, .. } | Self::Call { target, .. } => target,
            Self::Emit { source, .. } => source,
        }
    }
}

/// One command as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireCommand {
    /// `{"type": "init", ...}`
    #[serde(rename = "init", rename_all = "camelCase")]
    Init {
        /// Target exec name.
        component_exec_name: String,
        /// Explicit init params.
        #[serde(default)]
        init_params: Map<String, Value>,
        /// Merge with client-reported state (the default) or rebuild.
        #[serde(default = "default_true")]
        merge_existing_params: bool,
    },
    /// `{"type": "call", ...}`
    #[serde(rename = "call", rename_all = "camelCase")]
    Call {
        /// Target exec name.
        component_exec_name: String,
        /// Action name.
        action_name: String,
        /// Positional arguments.
        #[serde(default)]
        args: Vec<Value>,
        /// Keyword arguments.
        #[serde(default)]
        kwargs: Map<String, Value>,
    },
    /// `{"type": "emit", ...}`
    #[serde(rename = "emit", rename_all = "camelCase")]
    Emit {
        /// Emitting exec name.
        component_exec_name: String,
        /// Event name.
        event_name: String,
        /// Payload.
        #[serde(default)]
        params: Map<String, Value>,
        /// Optional destination pattern.
        #[serde(default)]
        to: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

impl WireCommand {
    /// Validates exec names and converts to a queue [`Command`].
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] for malformed exec names.
    pub fn into_command(self) -> Result<Command, JembeError> {
        Ok(match self {
            Self::Init {
                component_exec_name,
                init_params,
                merge_existing_params,
            } => Command::Init {
                target: ExecName::parse(&component_exec_name)?,
                params: init_params,
                merge_existing: merge_existing_params,
            },
            Self::Call {
                component_exec_name,
                action_name,
                args,
                kwargs,
            } => Command::Call {
                target: ExecName::parse(&component_exec_name)?,
                action: action_name,
                args: ActionArgs { args, kwargs },
            },
            Self::Emit {
                component_exec_name,
                event_name,
                params,
                to,
            } => {
                let mut emit = EventEmit::new(event_name);
                for (key, value) in params {
                    emit = emit.param(key, value);
                }
                if let Some(to) = to {
                    emit = emit.to(to);
                }
                Command::Emit {
                    source: ExecName::parse(&component_exec_name)?,
                    emit,
                }
            }
        })
    }
}

/// Client-reported presence of one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireComponent {
    /// Exec name the client knows the instance by.
    pub exec_name: String,
    /// Last state the client received for it.
    #[serde(default)]
    pub state: Map<String, Value>,
    /// URL the client last associated with it, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether the instance contributed to the URL, as last told.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_url: Option<bool>,
}

/// A full partial-request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XRequest {
    /// The client's current page composition.
    #[serde(default)]
    pub components: Vec<WireComponent>,
    /// Commands to run, in order.
    pub commands: Vec<WireCommand>,
}

impl XRequest {
    /// Parses a request body.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::BadRequest`] for malformed JSON.
    pub fn from_json(body: &str) -> Result<Self, JembeError> {
        Ok(serde_json::from_str(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_a_full_body() {
        let body = json!({
            "components": [
                {"execName": "/cpage", "state": {}},
                {"execName": "/cpage/counter.first", "state": {"value": 3}}
            ],
            "commands": [
                {
                    "type": "call",
                    "componentExecName": "/cpage/counter.first",
                    "actionName": "increase",
                    "args": [],
                    "kwargs": {"by": 2}
                }
            ]
        })
        .to_string();

        let request = XRequest::from_json(&body).expect("parse");
        assert_eq!(request.components.len(), 2);
        assert_eq!(request.components[1].exec_name, "/cpage/counter.first");

        let command = request.commands[0].clone().into_command().expect("command");
        match command {
            Command::Call { target, action, args } => {
                assert_eq!(target.as_str(), "/cpage/counter.first");
                assert_eq!(action, "increase");
                assert_eq!(args.kwarg("by"), Some(&json!(2)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_defaults_merge_existing() {
        let body = json!({
            "commands": [
                {"type": "init", "componentExecName": "/cpage/edit", "initParams": {"id": 7}}
            ]
        })
        .to_string();
        let request = XRequest::from_json(&body).expect("parse");
        match request.commands[0].clone().into_command().expect("command") {
            Command::Init { target, params, merge_existing } => {
                assert_eq!(target.as_str(), "/cpage/edit");
                assert_eq!(params["id"], json!(7));
                assert!(merge_existing);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn emit_command_carries_destination() {
        let body = json!({
            "commands": [
                {
                    "type": "emit",
                    "componentExecName": "/cpage",
                    "eventName": "refresh",
                    "params": {"scope": "all"},
                    "to": "./**"
                }
            ]
        })
        .to_string();
        let request = XRequest::from_json(&body).expect("parse");
        match request.commands[0].clone().into_command().expect("command") {
            Command::Emit { source, emit } => {
                assert_eq!(source.as_str(), "/cpage");
                assert_eq!(emit.name(), "refresh");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn malformed_exec_name_is_invalid() {
        let wire = WireCommand::Call {
            component_exec_name: "cpage/counter".into(),
            action_name: "display".into(),
            args: Vec::new(),
            kwargs: Map::new(),
        };
        assert!(wire.into_command().is_err());
    }

    #[test]
    fn malformed_json_is_bad_request() {
        let err = XRequest::from_json("{not json").expect_err("parse");
        assert!(matches!(err, JembeError::BadRequest(_)));
    }
}
