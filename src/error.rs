use std::fmt;

use thiserror::Error;

use crate::workflow::Step;

/// Which external service a failed call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Rooms,
    Registry,
    Names,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Service::*;
        f.write_str(match self {
            Rooms => "messaging platform",
            Registry => "webhook registry",
            Names => "random-name source",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamStatus {
    Code(u16),
    Timeout,
    Transport(String),
    Malformed(String),
}

impl fmt::Display for UpstreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use UpstreamStatus::*;
        match self {
            Code(code) => write!(f, "status code = {code}"),
            Timeout => f.write_str("timed out"),
            Transport(msg) => write!(f, "unreachable: {msg}"),
            Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("error calling the {service}, {status}")]
    Upstream {
        service: Service,
        status: UpstreamStatus,
    },

    #[error("the random-name source is unavailable")]
    SourceUnavailable,

    #[error("no unused name found after {attempts} draws")]
    PoolExhausted { attempts: usize },

    #[error("webhook references room \"{room}\" which is not in the loaded room list")]
    DataInconsistency { room: String },

    #[error("cannot {action} while {from}")]
    InvalidTransition { from: Step, action: &'static str },

    #[error("please provide your access token before continuing")]
    MissingToken,

    #[error("room \"{title}\" is not available")]
    UnknownRoom { title: String },

    #[error("another action is still running for this session")]
    Busy,
}

impl HookError {
    pub fn upstream(service: Service, status: UpstreamStatus) -> Self {
        Self::Upstream { service, status }
    }
}

pub type HookResult<T> = Result<T, HookError>;
