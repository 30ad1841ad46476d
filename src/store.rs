//! In-memory user registry and calculation history.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::core::{AgeGroup, Deductions, Investments, Regime, TaxResult};

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("User already exists")]
    UserExists,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A stored calculation: the submitted figures plus the engine's result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub financial_year: String,
    pub age_group: AgeGroup,
    pub regime: Regime,
    pub income: f64,
    pub hra_exempt: f64,
    pub deductions: Deductions,
    pub investments: Investments,
    pub result: TaxResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct Store {
    users: RwLock<Users>,
    calculations: RwLock<HashMap<Uuid, Vec<CalculationRecord>>>,
}

#[derive(Default)]
struct Users {
    by_id: HashMap<Uuid, User>,
    id_by_email: HashMap<String, Uuid>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: &str,
        email: &str,
        password_hash: String,
    ) -> Result<User, StoreError> {
        let email = normalize_email(email);
        let mut users = self.users.write();
        if users.id_by_email.contains_key(&email) {
            return Err(StoreError::UserExists);
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.clone(),
            password_hash,
            created_at: Utc::now(),
        };
        users.id_by_email.insert(email, user.id);
        users.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let users = self.users.read();
        users
            .id_by_email
            .get(&normalize_email(email))
            .and_then(|id| users.by_id.get(id))
            .cloned()
    }

    pub fn find_user(&self, id: Uuid) -> Option<User> {
        self.users.read().by_id.get(&id).cloned()
    }

    /// Appends a record, keeping only the owner's latest `HISTORY_LIMIT`.
    pub fn save_calculation(&self, record: CalculationRecord) {
        let mut calculations = self.calculations.write();
        let records = calculations.entry(record.user_id).or_default();
        records.push(record);
        if records.len() > HISTORY_LIMIT {
            let excess = records.len() - HISTORY_LIMIT;
            records.drain(..excess);
        }
    }

    /// The owner's most recent records, newest first.
    pub fn recent_calculations(&self, user_id: Uuid, limit: usize) -> Vec<CalculationRecord> {
        let calculations = self.calculations.read();
        let Some(records) = calculations.get(&user_id) else {
            return Vec::new();
        };
        // appended in arrival order
        records.iter().rev().take(limit).cloned().collect()
    }
}
