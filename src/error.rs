//! Errors that abort a NAV run.

use thiserror::Error;

use crate::models::TableName;

#[derive(Debug, Error)]
pub enum NavError {
    /// A balance, shares or configuration read failed. Nothing is written.
    #[error("{source_name} unavailable: {source:#}")]
    SourceUnavailable {
        source_name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Replacing an output table failed after computation.
    #[error("failed to write table {table}: {source:#}")]
    SinkWrite {
        table: TableName,
        #[source]
        source: anyhow::Error,
    },
}

impl NavError {
    pub(crate) fn source_unavailable(source_name: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| NavError::SourceUnavailable {
            source_name,
            source,
        }
    }

    pub(crate) fn sink_write(table: &TableName) -> impl FnOnce(anyhow::Error) -> Self + '_ {
        move |source| NavError::SinkWrite {
            table: table.clone(),
            source,
        }
    }
}

pub type NavResult<T> = Result<T, NavError>;
