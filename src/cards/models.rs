//! Data models for cards and their owners

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::crypto::mask_card_number;

/// Card activity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum CardStatus {
    Blocked = 0,
    Active = 1,
}

impl CardStatus {
    pub fn id(&self) -> i16 {
        *self as i16
    }
}

impl From<i16> for CardStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => CardStatus::Blocked,
            _ => CardStatus::Active,
        }
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum Role {
    User = 0,
    Admin = 1,
}

impl Role {
    pub fn id(&self) -> i16 {
        *self as i16
    }
}

impl From<i16> for Role {
    fn from(v: i16) -> Self {
        match v {
            1 => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Owner of zero or more cards. Authentication happens outside the core;
/// this is the already-authenticated principal handed in by the boundary.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

/// One issued card account.
///
/// `number_index` is the blind index of the card number (unique, equality
/// lookups); `number_enc` is the reversible ciphertext. The plaintext number
/// is never stored.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: i64,
    pub owner_id: i64,
    pub number_index: String,
    pub number_enc: String,
    pub expiry: NaiveDate,
    pub status: CardStatus,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active
    }
}

/// External view of a card: number masked to the last four digits.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub id: i64,
    pub masked_card_number: String,
    pub expiry: NaiveDate,
    pub status: CardStatus,
    pub balance: Decimal,
}

impl CardView {
    pub fn from_card(card: &Card, plain_number: &str) -> Self {
        Self {
            id: card.id,
            masked_card_number: mask_card_number(plain_number),
            expiry: card.expiry,
            status: card.status,
            balance: card.balance,
        }
    }
}

/// Optional search predicates, always combined with the owner scope.
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub status: Option<CardStatus>,
    pub min_balance: Option<Decimal>,
    pub max_balance: Option<Decimal>,
}

/// Sort direction over creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Zero-based page request. Default: first page of 10, newest first.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 10,
            sort: SortDirection::Desc,
        }
    }
}

impl PageRequest {
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.page_size as i64
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Immutable record of one completed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub id: i64,
    pub from_card_id: i64,
    pub to_card_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_card_status_from_i16() {
        assert_eq!(CardStatus::from(0), CardStatus::Blocked);
        assert_eq!(CardStatus::from(1), CardStatus::Active);
        assert_eq!(CardStatus::Active.id(), 1);
        assert_eq!(CardStatus::Blocked.id(), 0);
    }

    #[test]
    fn test_role_from_i16() {
        assert_eq!(Role::from(0), Role::User);
        assert_eq!(Role::from(1), Role::Admin);
        assert_eq!(Role::from(42), Role::User); // unknown roles are not admins
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&CardStatus::Active).unwrap(),
            "\"ACTIVE\""
        );
        let parsed: CardStatus = serde_json::from_str("\"BLOCKED\"").unwrap();
        assert_eq!(parsed, CardStatus::Blocked);
    }

    #[test]
    fn test_page_request_math() {
        let req = PageRequest::default();
        assert_eq!(req.limit(), 10);
        assert_eq!(req.offset(), 0);

        let req = PageRequest {
            page: 3,
            page_size: 25,
            sort: SortDirection::Asc,
        };
        assert_eq!(req.limit(), 25);
        assert_eq!(req.offset(), 75);
        assert_eq!(req.sort.as_sql(), "ASC");
    }

    #[test]
    fn test_card_view_masks_number() {
        let card = Card {
            id: 7,
            owner_id: 1,
            number_index: "idx".to_string(),
            number_enc: "enc".to_string(),
            expiry: NaiveDate::from_ymd_opt(2029, 6, 30).unwrap(),
            status: CardStatus::Active,
            balance: dec!(100.00),
            created_at: Utc::now(),
        };

        let view = CardView::from_card(&card, "6171053773368137");
        assert_eq!(view.masked_card_number, "**** **** **** 8137");
        assert_eq!(view.balance, dec!(100.00));
        assert!(!serde_json::to_string(&view).unwrap().contains("6171"));
    }
}
