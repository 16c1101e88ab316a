//! Orchestrator tables and prepared statements.

use crate::storage::{ColumnType, Operation, PreparedStatement, TableSchema};

pub const ADVERTISER: TableSchema = TableSchema {
    name: "advertiser",
    partition_key: &["name"],
    clustering_key: &[],
    columns: &[("name", ColumnType::Text), ("budget", ColumnType::Counter)],
};

pub const ADVERTISEMENT: TableSchema = TableSchema {
    name: "advertisement",
    partition_key: &["advertiser"],
    clustering_key: &["site", "id"],
    columns: &[
        ("advertiser", ColumnType::Text),
        ("site", ColumnType::Text),
        ("id", ColumnType::Int),
        ("rate_id", ColumnType::Int),
        ("active_to", ColumnType::Date),
    ],
};

pub const SITE: TableSchema = TableSchema {
    name: "site",
    partition_key: &["name"],
    clustering_key: &[],
    columns: &[("name", ColumnType::Text), ("pricing", ColumnType::Int)],
};

pub const TABLES: [TableSchema; 3] = [ADVERTISER, ADVERTISEMENT, SITE];

const AD_KEY: &[&str] = &["advertiser", "site", "id"];

/// Statements prepared once when the orchestrator starts.
#[derive(Debug, Clone)]
pub struct Statements {
    pub current_date: PreparedStatement,
    pub query_pricing: PreparedStatement,
    pub insert_site: PreparedStatement,
    /// Binds: amount, advertiser.
    pub decrease_budget: PreparedStatement,
    /// Binds: amount, advertiser.
    pub add_budget: PreparedStatement,
    /// Binds: advertiser, site, id, rate_id, active_to.
    pub create_ad: PreparedStatement,
    pub query_ads: PreparedStatement,
    pub query_rate_id: PreparedStatement,
    /// Binds: rate_id, advertiser, site, id.
    pub update_rate_id: PreparedStatement,
}

impl Statements {
    pub fn prepare() -> Self {
        Self {
            current_date: PreparedStatement::new("current_date", Operation::CurrentDate),
            query_pricing: PreparedStatement::new(
                "query_pricing",
                Operation::Select {
                    table: SITE.name,
                    key: &["name"],
                },
            ),
            insert_site: PreparedStatement::new(
                "insert_site",
                Operation::Insert {
                    table: SITE.name,
                    columns: &["name", "pricing"],
                },
            ),
            decrease_budget: PreparedStatement::new(
                "decrease_budget",
                Operation::CounterAdd {
                    table: ADVERTISER.name,
                    column: "budget",
                    key: &["name"],
                    subtract: true,
                },
            ),
            add_budget: PreparedStatement::new(
                "add_budget",
                Operation::CounterAdd {
                    table: ADVERTISER.name,
                    column: "budget",
                    key: &["name"],
                    subtract: false,
                },
            ),
            create_ad: PreparedStatement::new(
                "create_ad",
                Operation::Insert {
                    table: ADVERTISEMENT.name,
                    columns: &["advertiser", "site", "id", "rate_id", "active_to"],
                },
            ),
            query_ads: PreparedStatement::new(
                "query_ads",
                Operation::Select {
                    table: ADVERTISEMENT.name,
                    key: &["advertiser"],
                },
            ),
            query_rate_id: PreparedStatement::new(
                "query_rate_id",
                Operation::Select {
                    table: ADVERTISEMENT.name,
                    key: AD_KEY,
                },
            ),
            update_rate_id: PreparedStatement::new(
                "update_rate_id",
                Operation::Update {
                    table: ADVERTISEMENT.name,
                    column: "rate_id",
                    key: AD_KEY,
                },
            ),
        }
    }
}
