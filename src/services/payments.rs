use crate::{
    config::AppConfig,
    entities::{
        order, payment, CardAssociation, Order, OrderModel, OrderStatus, Payment, PaymentModel,
        PaymentState, PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// The sandbox card numbers. These bypass the checksum and always get an
/// approval from the mock gateway, so manual testing is deterministic.
const TEST_CARDS: [&str; 3] = [
    "5528790000000008",
    "4543590000000006",
    "4059030000000009",
];

const CARD_NUMBER_LEN: usize = 16;
const BIN_LEN: usize = 6;

/// Mock card-payment gateway.
///
/// Simulates an external processor: validates the submitted card, waits a
/// randomized 1-2 s of "network latency", draws an approval with the
/// configured probability, and records the attempt. The payment row and the
/// order update are committed in one transaction, so an attempt is either
/// fully recorded or not at all.
///
/// Only masked card data survives the call: BIN and last four digits. The
/// full PAN and the CVC are never persisted.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Runs one payment attempt against an order.
    ///
    /// Preconditions, checked in order: the order exists, belongs to the
    /// requesting user and is not already paid; the card number is 16
    /// digits passing the Luhn checksum (sandbox cards are exempt); the
    /// expiry is not in the past. A failed precondition surfaces before
    /// anything is written.
    ///
    /// A declined draw still records the Payment row and flips the order's
    /// payment state to `failed` before surfacing as an error; the order
    /// status itself is left untouched so the customer can retry.
    #[instrument(skip(self, card), fields(order_id = %order_id))]
    pub async fn process_payment(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        card: CardDetails,
    ) -> Result<PaymentReceipt, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.user_id != user_id {
            return Err(ServiceError::InvalidOperation(
                "Order does not belong to this user".to_string(),
            ));
        }

        // A failed previous attempt does not block a retry; only a settled
        // payment does.
        if order.payment_state == PaymentState::Paid {
            return Err(ServiceError::InvalidOperation(
                "Order is already paid".to_string(),
            ));
        }

        let number = normalize_card_number(&card.card_number);
        let sandbox = is_test_card(&number);
        validate_card_number(&number, sandbox)?;
        validate_expiry(card.expire_month, card.expire_year, Utc::now())?;

        let association = classify_association(&number);
        let bin = number[..BIN_LEN].to_string();
        let last_four = number[CARD_NUMBER_LEN - 4..].to_string();

        let gateway_payment_id = Uuid::new_v4().to_string();
        let conversation_id = Uuid::new_v4().to_string();

        // Draw outcome and latency up front; the RNG must not be held
        // across the await below.
        let (approved, delay_ms) = {
            let mut rng = rand::thread_rng();
            let approved = decide_outcome(
                sandbox,
                self.config.payment_success_rate,
                rng.gen::<f64>(),
            );
            let delay_ms = rng
                .gen_range(self.config.payment_min_delay_ms..=self.config.payment_max_delay_ms);
            (approved, delay_ms)
        };

        // Simulated gateway round-trip; only this request waits.
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let status = if approved {
            PaymentStatus::Succeeded
        } else {
            PaymentStatus::Failed
        };
        let error_message =
            (!approved).then(|| "Card declined by issuing bank".to_string());

        let gateway_response = serde_json::json!({
            "status": if approved { "success" } else { "failure" },
            "paymentId": gateway_payment_id.clone(),
            "conversationId": conversation_id.clone(),
            "price": order.total_amount,
            "currency": order.currency.clone(),
            "cardAssociation": association.to_string(),
            "cardType": "CREDIT_CARD",
            "binNumber": bin.clone(),
            "lastFourDigits": last_four.clone(),
            "errorMessage": error_message.clone(),
        });

        // One transaction for both writes: the attempt row and the order
        // state must land together or not at all.
        let txn = self.db.begin().await?;

        let payment_row = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            gateway_payment_id: Set(gateway_payment_id.clone()),
            conversation_id: Set(conversation_id.clone()),
            amount: Set(order.total_amount),
            currency: Set(order.currency.clone()),
            card_association: Set(association),
            card_type: Set("CREDIT_CARD".to_string()),
            card_holder: Set(card.card_holder_name.clone()),
            bin: Set(bin),
            last_four: Set(last_four),
            status: Set(status),
            gateway_response: Set(gateway_response),
            error_message: Set(error_message.clone()),
            created_at: Set(Utc::now()),
        };
        let payment_row = payment_row.insert(&txn).await?;

        let mut order_update: order::ActiveModel = order.clone().into();
        if approved {
            order_update.status = Set(OrderStatus::Confirmed);
            order_update.payment_state = Set(PaymentState::Paid);
            order_update.paid_at = Set(Some(Utc::now()));
        } else {
            order_update.payment_state = Set(PaymentState::Failed);
        }
        order_update.updated_at = Set(Utc::now());
        let order = order_update.update(&txn).await?;

        txn.commit().await?;

        if approved {
            self.event_sender
                .send_or_log(Event::PaymentSucceeded {
                    order_id: order.id,
                    payment_id: payment_row.id,
                })
                .await;
            info!("Payment {} approved for order {}", payment_row.id, order.id);
            Ok(PaymentReceipt::from_parts(&payment_row, &order))
        } else {
            self.event_sender
                .send_or_log(Event::PaymentFailed {
                    order_id: order.id,
                    payment_id: payment_row.id,
                })
                .await;
            warn!("Payment {} declined for order {}", payment_row.id, order.id);
            Err(ServiceError::PaymentDeclined(
                error_message.unwrap_or_else(|| "Payment was declined".to_string()),
            ))
        }
    }

    /// Latest payment attempt recorded for an order the user may see.
    #[instrument(skip(self))]
    pub async fn payment_status(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<PaymentModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.user_id != user_id && !is_admin {
            // Report foreign orders as absent rather than leaking them.
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }

        Payment::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_desc(payment::Column::CreatedAt)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No payment attempts for order {}", order_id))
            })
    }

    /// The canned sandbox cards, for manual testing against the mock
    /// gateway. Unauthenticated by design.
    pub fn test_cards(&self) -> Vec<TestCard> {
        TEST_CARDS
            .iter()
            .map(|number| TestCard {
                card_number: (*number).to_string(),
                card_association: classify_association(number),
            })
            .collect()
    }
}

/// Card details submitted at checkout. The CVC is accepted for realism but
/// neither validated nor stored.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub card_holder_name: String,
    pub card_number: String,
    pub expire_month: u32,
    pub expire_year: i32,
    #[allow(dead_code)]
    pub cvc: String,
}

/// Summary returned to the client after an approved attempt.
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub payment_state: PaymentState,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub card_association: CardAssociation,
    pub bin: String,
    pub last_four: String,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentReceipt {
    fn from_parts(payment_row: &PaymentModel, order: &OrderModel) -> Self {
        Self {
            payment_id: payment_row.id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            order_status: order.status,
            payment_state: order.payment_state,
            amount: payment_row.amount,
            currency: payment_row.currency.clone(),
            card_association: payment_row.card_association,
            bin: payment_row.bin.clone(),
            last_four: payment_row.last_four.clone(),
            paid_at: order.paid_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TestCard {
    pub card_number: String,
    pub card_association: CardAssociation,
}

fn normalize_card_number(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

fn is_test_card(number: &str) -> bool {
    TEST_CARDS.contains(&number)
}

fn validate_card_number(number: &str, sandbox: bool) -> Result<(), ServiceError> {
    if number.len() != CARD_NUMBER_LEN || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(
            "Card number must be exactly 16 digits".to_string(),
        ));
    }
    if !sandbox && !luhn_valid(number) {
        return Err(ServiceError::ValidationError(
            "Card number failed checksum validation".to_string(),
        ));
    }
    Ok(())
}

/// Standard Luhn checksum over an all-digit string.
fn luhn_valid(number: &str) -> bool {
    let mut sum = 0u32;
    for (i, b) in number.bytes().rev().enumerate() {
        let mut digit = (b - b'0') as u32;
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

/// Rejects cards whose (year, month) lies strictly before the current
/// year/month; a card expiring this month is still valid.
fn validate_expiry(
    month: u32,
    year: i32,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if !(1..=12).contains(&month) {
        return Err(ServiceError::ValidationError(
            "Invalid expiry month".to_string(),
        ));
    }

    let current_year = now.year();
    let current_month = now.month();
    if year < current_year || (year == current_year && month < current_month) {
        return Err(ServiceError::ValidationError("Card is expired".to_string()));
    }
    Ok(())
}

/// Card scheme from the PAN's leading digits.
fn classify_association(number: &str) -> CardAssociation {
    if number.starts_with('4') {
        CardAssociation::Visa
    } else if matches!(&number[..2.min(number.len())], "51" | "52" | "53" | "54" | "55") {
        CardAssociation::MasterCard
    } else if number.starts_with("34") || number.starts_with("37") {
        CardAssociation::AmericanExpress
    } else {
        CardAssociation::Unknown
    }
}

/// Sandbox cards are always approved; everything else rides the draw.
fn decide_outcome(sandbox: bool, success_rate: f64, draw: f64) -> bool {
    sandbox || draw < success_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn luhn_accepts_known_good_numbers() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("5555555555554444"));
        assert!(luhn_valid("4242424242424242"));
    }

    #[test]
    fn luhn_rejects_known_bad_numbers() {
        assert!(!luhn_valid("4000000000000000"));
        assert!(!luhn_valid("4242424242424241"));
        assert!(!luhn_valid("1234567890123456"));
    }

    #[test]
    fn card_number_must_be_sixteen_digits() {
        // 15-digit Amex format is rejected by this gateway.
        assert!(validate_card_number("378282246310005", false).is_err());
        assert!(validate_card_number("41111111111111112", false).is_err());
        assert!(validate_card_number("4111-1111-1111-11", false).is_err());
        assert!(validate_card_number("4111111111111111", false).is_ok());
    }

    #[test]
    fn sandbox_cards_bypass_the_checksum() {
        for number in TEST_CARDS {
            assert!(is_test_card(number));
            assert!(validate_card_number(number, true).is_ok());
        }
        // But an arbitrary Luhn-invalid number does not.
        assert!(!is_test_card("4000000000000000"));
        assert!(validate_card_number("4000000000000000", false).is_err());
    }

    #[test]
    fn sandbox_cards_always_approve_regardless_of_draw() {
        assert!(decide_outcome(true, 0.0, 0.999999));
        assert!(decide_outcome(true, 0.0, 0.0));
    }

    #[test]
    fn regular_cards_follow_the_draw() {
        assert!(decide_outcome(false, 0.9, 0.899));
        assert!(!decide_outcome(false, 0.9, 0.9));
        assert!(!decide_outcome(false, 0.9, 0.95));
    }

    #[test]
    fn association_classification_follows_leading_digits() {
        assert_eq!(classify_association("4111111111111111"), CardAssociation::Visa);
        assert_eq!(
            classify_association("5528790000000008"),
            CardAssociation::MasterCard
        );
        assert_eq!(
            classify_association("5111111111111118"),
            CardAssociation::MasterCard
        );
        assert_eq!(
            classify_association("3411111111111111"),
            CardAssociation::AmericanExpress
        );
        assert_eq!(
            classify_association("3711111111111111"),
            CardAssociation::AmericanExpress
        );
        assert_eq!(
            classify_association("6011111111111117"),
            CardAssociation::Unknown
        );
        assert_eq!(
            classify_association("5611111111111113"),
            CardAssociation::Unknown
        );
    }

    #[test]
    fn expiry_in_the_past_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        assert!(validate_expiry(7, 2026, now).is_err());
        assert!(validate_expiry(12, 2025, now).is_err());
    }

    #[test]
    fn expiry_this_month_or_later_is_accepted() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        assert!(validate_expiry(8, 2026, now).is_ok());
        assert!(validate_expiry(1, 2027, now).is_ok());
    }

    #[test]
    fn out_of_range_month_is_rejected() {
        let now = Utc::now();
        assert!(validate_expiry(0, 2099, now).is_err());
        assert!(validate_expiry(13, 2099, now).is_err());
    }

    #[test]
    fn normalization_strips_spaces_and_dashes() {
        assert_eq!(
            normalize_card_number("4111 1111 1111 1111"),
            "4111111111111111"
        );
        assert_eq!(
            normalize_card_number("4111-1111-1111-1111"),
            "4111111111111111"
        );
    }

    #[test]
    fn masking_keeps_only_bin_and_last_four() {
        let number = "4111111111111111";
        let bin = &number[..BIN_LEN];
        let last_four = &number[CARD_NUMBER_LEN - 4..];
        assert_eq!(bin, "411111");
        assert_eq!(last_four, "1111");
        // Nothing between BIN and the last four survives masking.
        assert_eq!(bin.len() + last_four.len(), 10);
    }
}
