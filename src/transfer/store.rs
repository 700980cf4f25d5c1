//! Append-only store of completed transfers.
//!
//! Inserts happen only inside the engine's transaction; records are never
//! updated or deleted afterwards.

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use crate::cards::models::Transfer;
use crate::error::LedgerError;

pub struct TransferStore {
    pool: PgPool,
}

impl TransferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, transfer_id: i64) -> Result<Option<Transfer>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT id, from_card_id, to_card_id, amount, created_at
            FROM transfers
            WHERE id = $1
            "#,
        )
        .bind(transfer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_transfer(&r)))
    }

    /// Transfers where the card was source or destination, newest first.
    pub async fn list_for_card(
        &self,
        card_id: i64,
        limit: i64,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT id, from_card_id, to_card_id, amount, created_at
            FROM transfers
            WHERE from_card_id = $1 OR to_card_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(card_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_transfer).collect())
    }

    /// Record a completed transfer inside the caller's transaction, so the
    /// record commits atomically with the matching debit and credit.
    pub async fn insert_in_tx(
        conn: &mut PgConnection,
        from_card_id: i64,
        to_card_id: i64,
        amount: Decimal,
    ) -> Result<Transfer, LedgerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO transfers (from_card_id, to_card_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_card_id, to_card_id, amount, created_at
            "#,
        )
        .bind(from_card_id)
        .bind(to_card_id)
        .bind(amount)
        .fetch_one(conn)
        .await?;

        Ok(row_to_transfer(&row))
    }
}

fn row_to_transfer(row: &PgRow) -> Transfer {
    Transfer {
        id: row.get("id"),
        from_card_id: row.get("from_card_id"),
        to_card_id: row.get("to_card_id"),
        amount: row.get("amount"),
        created_at: row.get("created_at"),
    }
}
