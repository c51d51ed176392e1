//! Payment model

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Ewallet,
    Qris,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Ewallet => "ewallet",
            PaymentMethod::Qris => "qris",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "credit_card" => Some(PaymentMethod::CreditCard),
            "debit_card" => Some(PaymentMethod::DebitCard),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "ewallet" => Some(PaymentMethod::Ewallet),
            "qris" => Some(PaymentMethod::Qris),
            _ => None,
        }
    }
}

/// What the money is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Deposit,
    #[default]
    FullPayment,
    AdditionalCharge,
    Refund,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Deposit => "deposit",
            PaymentKind::FullPayment => "full_payment",
            PaymentKind::AdditionalCharge => "additional_charge",
            PaymentKind::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(PaymentKind::Deposit),
            "full_payment" => Some(PaymentKind::FullPayment),
            "additional_charge" => Some(PaymentKind::AdditionalCharge),
            "refund" => Some(PaymentKind::Refund),
            _ => None,
        }
    }
}

/// Processing state of a single payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Processing => "processing",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
            PaymentState::Cancelled => "cancelled",
            PaymentState::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentState::Pending),
            "processing" => Some(PaymentState::Processing),
            "completed" => Some(PaymentState::Completed),
            "failed" => Some(PaymentState::Failed),
            "cancelled" => Some(PaymentState::Cancelled),
            "refunded" => Some(PaymentState::Refunded),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: PaymentState) -> bool {
        use PaymentState::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Completed, Refunded)
        )
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub payment_code: String,
    pub reservation_id: Uuid,
    pub amount: f64,
    pub method: PaymentMethod,
    pub kind: PaymentKind,
    pub currency: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub status: PaymentState,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_CURRENCY: &str = "IDR";

impl Payment {
    pub fn new(reservation_id: Uuid, amount: f64, method: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payment_code: generate_code("PAY", now),
            reservation_id,
            amount,
            method,
            kind: PaymentKind::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            transaction_id: None,
            notes: None,
            status: PaymentState::Pending,
            paid_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves to `next`, stamping `paid_at` / `refunded_at` on entry.
    /// Returns false when the edge is not allowed.
    pub fn apply_state(&mut self, next: PaymentState, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        match next {
            PaymentState::Completed => self.paid_at = Some(at),
            PaymentState::Refunded => self.refunded_at = Some(at),
            _ => {}
        }
        self.status = next;
        self.updated_at = at;
        true
    }
}

/// Optional filters for payment listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub reservation_id: Option<Uuid>,
    pub status: Option<PaymentState>,
    pub method: Option<PaymentMethod>,
}

/// `{prefix}{yymmdd}{4 digits}`, e.g. `RSV2506101234`
pub fn generate_code(prefix: &str, at: DateTime<Utc>) -> String {
    let n: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{prefix}{}{n:04}", at.format("%y%m%d"))
}
