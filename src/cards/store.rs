//! Persistence boundary for card records.
//!
//! Point lookups return `Option<Card>`; absence is a value, and callers
//! decide which error kind it becomes. Row-locking reads take a
//! `&mut PgConnection` so they compose into the caller's transaction.

use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};

use super::models::{Card, CardFilter, CardStatus, Page, PageRequest};
use crate::crypto::CardIdentity;
use crate::error::LedgerError;

const CARD_COLUMNS: &str =
    "id, owner_id, number_index, number_enc, expiry, status, balance, created_at";

pub struct CardStore {
    pool: PgPool,
}

impl CardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a card by blind index across all owners (privileged paths).
    pub async fn find_by_index(&self, index: &str) -> Result<Option<Card>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE number_index = $1"
        ))
        .bind(index)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_card(&r)))
    }

    /// Look up a card by blind index, scoped to an owner.
    pub async fn find_by_index_and_owner(
        &self,
        index: &str,
        owner_id: i64,
    ) -> Result<Option<Card>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE number_index = $1 AND owner_id = $2"
        ))
        .bind(index)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_card(&r)))
    }

    pub async fn find_by_id_and_owner(
        &self,
        card_id: i64,
        owner_id: i64,
    ) -> Result<Option<Card>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1 AND owner_id = $2"
        ))
        .bind(card_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_card(&r)))
    }

    pub async fn exists_by_index(&self, index: &str) -> Result<bool, LedgerError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM cards WHERE number_index = $1)")
                .bind(index)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Card>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_card).collect())
    }

    /// Every card in the system (privileged).
    pub async fn list_all(&self) -> Result<Vec<Card>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_card).collect())
    }

    /// Insert a new ACTIVE card with zero balance inside the caller's
    /// transaction, so the existence check and the insert commit as one unit.
    pub async fn insert_in_tx(
        conn: &mut PgConnection,
        owner_id: i64,
        identity: &CardIdentity,
        expiry: chrono::NaiveDate,
    ) -> Result<Card, LedgerError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cards (owner_id, number_index, number_enc, expiry, status, balance)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(&identity.index)
        .bind(&identity.ciphertext)
        .bind(expiry)
        .bind(CardStatus::Active.id())
        .fetch_one(conn)
        .await?;

        Ok(row_to_card(&row))
    }

    /// Remove a card permanently. Returns false if no card matched.
    pub async fn delete_by_index(&self, index: &str) -> Result<bool, LedgerError> {
        let result = sqlx::query("DELETE FROM cards WHERE number_index = $1")
            .bind(index)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Filtered, paginated search scoped to one owner.
    pub async fn search(
        &self,
        owner_id: i64,
        filter: &CardFilter,
        page: PageRequest,
    ) -> Result<Page<Card>, LedgerError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM cards WHERE owner_id = ");
        push_filters(&mut count_qb, owner_id, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CARD_COLUMNS} FROM cards WHERE owner_id = "));
        push_filters(&mut qb, owner_id, filter);
        qb.push(" ORDER BY created_at ")
            .push(page.sort.as_sql())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build().fetch_all(&self.pool).await?;

        Ok(Page {
            items: rows.iter().map(row_to_card).collect(),
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    // === Transaction-scoped, row-locking reads ===

    /// Lock a card row by blind index for a read-check-write sequence.
    pub async fn lock_by_index(
        conn: &mut PgConnection,
        index: &str,
    ) -> Result<Option<Card>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE number_index = $1 FOR UPDATE"
        ))
        .bind(index)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|r| row_to_card(&r)))
    }

    /// Lock a card row by blind index, scoped to an owner.
    pub async fn lock_by_index_and_owner(
        conn: &mut PgConnection,
        index: &str,
        owner_id: i64,
    ) -> Result<Option<Card>, LedgerError> {
        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE number_index = $1 AND owner_id = $2 FOR UPDATE"
        ))
        .bind(index)
        .bind(owner_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|r| row_to_card(&r)))
    }

    /// Lock two card rows in ascending id order, regardless of argument
    /// order. Fixed global lock order keeps opposite-direction transfers
    /// from deadlocking.
    pub async fn lock_pair_by_id(
        conn: &mut PgConnection,
        first_id: i64,
        second_id: i64,
    ) -> Result<Vec<Card>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id IN ($1, $2) ORDER BY id FOR UPDATE"
        ))
        .bind(first_id)
        .bind(second_id)
        .fetch_all(conn)
        .await?;

        Ok(rows.iter().map(row_to_card).collect())
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        card_id: i64,
        status: CardStatus,
    ) -> Result<(), LedgerError> {
        sqlx::query("UPDATE cards SET status = $1 WHERE id = $2")
            .bind(status.id())
            .bind(card_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn add_balance(
        conn: &mut PgConnection,
        card_id: i64,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        sqlx::query("UPDATE cards SET balance = balance + $1 WHERE id = $2")
            .bind(amount)
            .bind(card_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, owner_id: i64, filter: &CardFilter) {
    qb.push_bind(owner_id);
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.id());
    }
    if let Some(min) = filter.min_balance {
        qb.push(" AND balance >= ").push_bind(min);
    }
    if let Some(max) = filter.max_balance {
        qb.push(" AND balance <= ").push_bind(max);
    }
}

pub(crate) fn row_to_card(row: &PgRow) -> Card {
    Card {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        number_index: row.get("number_index"),
        number_enc: row.get("number_enc"),
        expiry: row.get("expiry"),
        status: CardStatus::from(row.get::<i16, _>("status")),
        balance: row.get("balance"),
        created_at: row.get("created_at"),
    }
}

/// True when the error is a violation of the unique blind-index constraint.
pub(crate) fn is_unique_violation(err: &LedgerError) -> bool {
    match err {
        LedgerError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::models::SortDirection;
    use rust_decimal_macros::dec;

    #[test]
    fn test_search_sql_owner_only() {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM cards WHERE owner_id = ");
        push_filters(&mut qb, 1, &CardFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM cards WHERE owner_id = $1");
    }

    #[test]
    fn test_search_sql_all_filters() {
        let filter = CardFilter {
            status: Some(CardStatus::Active),
            min_balance: Some(dec!(10)),
            max_balance: Some(dec!(500)),
        };
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT id FROM cards WHERE owner_id = ");
        push_filters(&mut qb, 1, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM cards WHERE owner_id = $1 AND status = $2 AND balance >= $3 AND balance <= $4"
        );
    }

    #[test]
    fn test_default_sort_is_created_at_desc() {
        assert_eq!(PageRequest::default().sort, SortDirection::Desc);
    }
}
