//! Second hop of the probe chain: reads the playlists table.

use std::sync::Arc;

use crate::config::PlaylistSeed;
use crate::error::LedgerResult;
use crate::propagation::TraceStrategy;
use crate::storage::{ColumnType, Operation, PreparedStatement, SessionHandle, TableSchema};

pub const CLASSIC_TRACING_PREFIX: &str = "CLASSIC_TRACING_DATA: ";

pub const PLAYLISTS: TableSchema = TableSchema {
    name: "playlists",
    partition_key: &["id"],
    clustering_key: &["title", "album", "artist"],
    columns: &[
        ("id", ColumnType::Text),
        ("title", ColumnType::Text),
        ("album", ColumnType::Text),
        ("artist", ColumnType::Text),
        ("song_id", ColumnType::Text),
    ],
};

#[derive(Debug)]
struct Statements {
    fetch: PreparedStatement,
    insert: PreparedStatement,
}

#[derive(Clone, Debug)]
pub struct Receiver {
    session: SessionHandle,
    statements: Arc<Statements>,
}

impl Receiver {
    pub fn new(session: SessionHandle) -> Self {
        let statements = Statements {
            fetch: PreparedStatement::new(
                "fetch_playlists",
                Operation::Select {
                    table: PLAYLISTS.name,
                    key: &[],
                },
            ),
            insert: PreparedStatement::new(
                "insert_playlist",
                Operation::Insert {
                    table: PLAYLISTS.name,
                    columns: &["id", "title", "album", "artist", "song_id"],
                },
            ),
        };
        Self {
            session,
            statements: Arc::new(statements),
        }
    }

    pub async fn seed(&self, playlists: &[PlaylistSeed]) -> LedgerResult<()> {
        for seed in playlists {
            let bound = self.statements.insert.bind(vec![
                seed.id.as_str().into(),
                seed.title.as_str().into(),
                seed.album.as_str().into(),
                seed.artist.as_str().into(),
                seed.song_id.as_str().into(),
            ])?;
            self.session.execute(bound, &TraceStrategy::Untraced).await?;
        }
        tracing::info!(rows = playlists.len(), "Playlists seeded");
        Ok(())
    }

    /// Every playlist row, rendered. A classic-traced fetch appends one line
    /// with the diagnostics the store recorded for it.
    pub async fn fetch(&self, strategy: &TraceStrategy) -> LedgerResult<Vec<String>> {
        let bound = self.statements.fetch.bind(Vec::new())?;
        let result = self.session.execute(bound, strategy).await?;

        let mut lines: Vec<String> = result.rows().iter().map(|row| row.to_string()).collect();
        if let Some(trace) = result.execution_trace() {
            lines.push(format!("{}{}", CLASSIC_TRACING_PREFIX, trace));
        }
        Ok(lines)
    }
}
