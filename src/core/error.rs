use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

pub type RecorderResult<T> = Result<T, RecorderError>;

/// Failures on the recording path. Every variant except `Message` is fatal
/// for the running recorder: no retry, no partial recovery mid-event.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("{message}")]
    Message { message: String },
    #[error("could not deduce output format from '{format}'")]
    UnknownFormat { format: String },
    #[error("unable to allocate output context: {reason}")]
    OutputContext { reason: String },
    #[error("could not open {stream} codec: {reason}")]
    CodecOpen { stream: &'static str, reason: String },
    #[error("could not open output file '{}': {source}", path.display())]
    OpenTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to convert input frame ({from}) to output frame ({to}) at frame {frame}")]
    Conversion { from: String, to: String, frame: u64 },
    #[error("error writing {stream} frame to '{}': {source}", path.display())]
    Write {
        stream: &'static str,
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl RecorderError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn write(
        stream: &'static str,
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Write {
            stream,
            path: path.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{message}")]
    Message { message: String },
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ConfigError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Context {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
