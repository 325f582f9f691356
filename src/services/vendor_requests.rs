use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    db::DbPool,
    entities::quote::{self, Entity as QuoteEntity, QuoteStatus},
    entities::quote_item::{self, Entity as QuoteItemEntity},
    entities::vendor_request::{
        self, Entity as VendorRequestEntity, SnapshotItem, VendorRequestStatus,
    },
    entities::vendor_response_item::{self, Entity as VendorResponseItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    mailer::{MailKind, Mailer},
};

pub const RESPONSE_TOKEN_PREFIX: &str = "vrt_";
pub const RESPONSE_TOKEN_RANDOM_LEN: usize = 32;

const MAX_EXPIRY_DAYS: i64 = 90;

/// Generates an unguessable vendor-response token. Uniqueness rests on
/// entropy (32 alphanumeric chars, ~190 bits), not on any counter.
pub fn generate_response_token() -> String {
    let random: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESPONSE_TOKEN_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", RESPONSE_TOKEN_PREFIX, random)
}

/// Cheap shape check applied before any lookup.
pub fn is_valid_token_format(token: &str) -> bool {
    token
        .strip_prefix(RESPONSE_TOKEN_PREFIX)
        .map(|rest| {
            rest.len() == RESPONSE_TOKEN_RANDOM_LEN
                && rest.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct VendorContact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateVendorRequestsInput {
    pub vendors: Vec<VendorContact>,
    pub message: Option<String>,
    pub expires_in_days: Option<i64>,
}

/// Per-vendor delivery result. One vendor's failed email never blocks the
/// others or the created records.
#[derive(Debug, Clone)]
pub struct VendorDispatch {
    pub vendor_email: String,
    pub sent: bool,
}

#[derive(Debug)]
pub struct CreateVendorRequestsOutcome {
    pub requests: Vec<vendor_request::Model>,
    pub dispatches: Vec<VendorDispatch>,
}

#[derive(Debug, Clone)]
pub struct VendorResponseLineInput {
    pub snapshot_item_id: Uuid,
    pub unit_price: i64,
    pub currency: Option<String>,
    pub lead_time_days: Option<i32>,
    pub minimum_order_quantity: Option<i32>,
    pub vendor_sku: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmitVendorResponseInput {
    pub vendor_name: Option<String>,
    pub items: Vec<VendorResponseLineInput>,
}

#[derive(Debug, Clone)]
pub struct SubmitVendorResponseOutcome {
    pub vendor_request_id: Uuid,
    pub is_edit: bool,
    pub edit_count: i32,
    pub edit_limit: i32,
    pub changed_lines: usize,
}

/// Vendor request exchange: freezes quote items into per-vendor snapshots,
/// hands out token-addressed response slots and accepts bounded revisions
/// against the frozen snapshot, never the live quote.
#[derive(Clone)]
pub struct VendorRequestService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    mailer: Arc<dyn Mailer>,
    response_edit_limit: i32,
    default_expiry_days: i64,
    default_currency: String,
}

impl VendorRequestService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        mailer: Arc<dyn Mailer>,
        response_edit_limit: i32,
        default_expiry_days: i64,
        default_currency: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            mailer,
            response_edit_limit,
            default_expiry_days,
            default_currency,
        }
    }

    /// Sends a quote out to a batch of vendors. The quote's items are
    /// snapshotted once, at send time; each vendor gets their own token and
    /// expiry against that frozen copy.
    #[instrument(skip(self, input), fields(quote_id = %quote_id, vendors = input.vendors.len(), user_id = %user.user_id))]
    pub async fn create_requests(
        &self,
        user: &CurrentUser,
        quote_id: Uuid,
        input: CreateVendorRequestsInput,
    ) -> Result<CreateVendorRequestsOutcome, ServiceError> {
        if input.vendors.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one vendor is required".to_string(),
            ));
        }
        for vendor in &input.vendors {
            if !vendor.email.contains('@') {
                return Err(ServiceError::ValidationError(format!(
                    "Invalid vendor email: {}",
                    vendor.email
                )));
            }
        }
        let expires_in_days = input.expires_in_days.unwrap_or(self.default_expiry_days);
        if !(1..=MAX_EXPIRY_DAYS).contains(&expires_in_days) {
            return Err(ServiceError::ValidationError(format!(
                "Expiry must be between 1 and {} days",
                MAX_EXPIRY_DAYS
            )));
        }

        let now = Utc::now();
        let expires_at = now + Duration::days(expires_in_days);

        let txn = self.db.begin().await?;

        let quote = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;
        if quote.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Quote belongs to another user".to_string(),
            ));
        }
        if !matches!(
            quote.status,
            QuoteStatus::Pending | QuoteStatus::Parsed | QuoteStatus::Sent | QuoteStatus::Responded
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot send a quote in status {}",
                quote.status
            )));
        }

        let items = QuoteItemEntity::find()
            .filter(quote_item::Column::QuoteId.eq(quote_id))
            .order_by_asc(quote_item::Column::LineNumber)
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Quote has no items to send".to_string(),
            ));
        }

        let snapshot_items: Vec<SnapshotItem> = items
            .iter()
            .map(|item| SnapshotItem {
                item_id: item.id,
                line_number: item.line_number,
                product_name: item.product_name.clone(),
                brand: item.brand.clone(),
                catalog_number: item.catalog_number.clone(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                unit_price: item.unit_price,
                pack_size: item.pack_size.clone(),
                notes: item.notes.clone(),
            })
            .collect();
        let snapshot = serde_json::to_value(&snapshot_items)
            .map_err(|e| ServiceError::InternalError(format!("snapshot encoding failed: {}", e)))?;

        let mut requests = Vec::with_capacity(input.vendors.len());
        for vendor in &input.vendors {
            let model = vendor_request::ActiveModel {
                id: Set(Uuid::new_v4()),
                quote_id: Set(quote_id),
                vendor_name: Set(vendor.name.clone()),
                vendor_email: Set(vendor.email.clone()),
                token: Set(generate_response_token()),
                status: Set(VendorRequestStatus::Sent),
                expires_at: Set(expires_at),
                snapshot: Set(snapshot.clone()),
                response_edit_count: Set(0),
                response_edit_limit: Set(self.response_edit_limit),
                responded_at: Set(None),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            };
            requests.push(model.insert(&txn).await?);
        }

        let old_status = quote.status;
        let quote_moved = matches!(old_status, QuoteStatus::Pending | QuoteStatus::Parsed);
        if quote_moved {
            let mut active: quote::ActiveModel = quote.into();
            active.status = Set(QuoteStatus::Sent);
            active.updated_at = Set(Some(now));
            active.update(&txn).await?;
        }

        txn.commit().await?;

        info!(
            quote_id = %quote_id,
            requests = requests.len(),
            expires_at = %expires_at,
            "Vendor requests created"
        );

        if quote_moved {
            self.dispatch(Event::QuoteStatusChanged {
                quote_id,
                old_status: old_status.to_string(),
                new_status: QuoteStatus::Sent.to_string(),
            })
            .await;
        }

        // Emails are best-effort and isolated per vendor; the records above
        // are already durable.
        let mut dispatches = Vec::with_capacity(requests.len());
        for request in &requests {
            let payload = json!({
                "quote_id": quote_id,
                "vendor_name": request.vendor_name,
                "message": input.message,
                "token": request.token,
                "expires_at": request.expires_at,
            });
            let sent = match self
                .mailer
                .send(MailKind::VendorQuoteRequest, &request.vendor_email, payload)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        vendor_request_id = %request.id,
                        vendor_email = %request.vendor_email,
                        "Vendor email failed: {}",
                        e
                    );
                    false
                }
            };
            dispatches.push(VendorDispatch {
                vendor_email: request.vendor_email.clone(),
                sent,
            });

            self.dispatch(Event::VendorRequestCreated {
                quote_id,
                vendor_request_id: request.id,
                vendor_email: request.vendor_email.clone(),
            })
            .await;
        }

        Ok(CreateVendorRequestsOutcome {
            requests,
            dispatches,
        })
    }

    /// Lists a quote's vendor requests. Any SENT request past its deadline
    /// is transitioned to EXPIRED here, on read; nothing schedules expiry.
    #[instrument(skip(self), fields(quote_id = %quote_id, user_id = %user.user_id))]
    pub async fn get_requests(
        &self,
        user: &CurrentUser,
        quote_id: Uuid,
    ) -> Result<Vec<vendor_request::Model>, ServiceError> {
        let quote = QuoteEntity::find_by_id(quote_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;
        if quote.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Quote belongs to another user".to_string(),
            ));
        }

        let now = Utc::now();
        let expired = VendorRequestEntity::update_many()
            .col_expr(
                vendor_request::Column::Status,
                Expr::value(VendorRequestStatus::Expired),
            )
            .col_expr(vendor_request::Column::UpdatedAt, Expr::value(now))
            .filter(vendor_request::Column::QuoteId.eq(quote_id))
            .filter(vendor_request::Column::Status.eq(VendorRequestStatus::Sent))
            .filter(vendor_request::Column::ExpiresAt.lt(now))
            .exec(self.db.as_ref())
            .await?;
        if expired.rows_affected > 0 {
            info!(
                quote_id = %quote_id,
                count = expired.rows_affected,
                "Vendor requests lazily expired"
            );
        }

        let requests = VendorRequestEntity::find()
            .filter(vendor_request::Column::QuoteId.eq(quote_id))
            .order_by_asc(vendor_request::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(requests)
    }

    /// Public, token-addressed view of one request: the frozen snapshot and
    /// any previously submitted response lines.
    #[instrument(skip(self, token))]
    pub async fn get_request_by_token(
        &self,
        token: &str,
    ) -> Result<(vendor_request::Model, Vec<vendor_response_item::Model>), ServiceError> {
        if !is_valid_token_format(token) {
            return Err(ServiceError::InvalidToken);
        }

        let request = VendorRequestEntity::find()
            .filter(vendor_request::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendor request not found".to_string()))?;

        let request = if request.is_expired(Utc::now()) {
            let mut active: vendor_request::ActiveModel = request.into();
            active.status = Set(VendorRequestStatus::Expired);
            active.updated_at = Set(Some(Utc::now()));
            active.update(self.db.as_ref()).await?
        } else {
            request
        };

        let responses = VendorResponseItemEntity::find()
            .filter(vendor_response_item::Column::VendorRequestId.eq(request.id))
            .all(self.db.as_ref())
            .await?;

        Ok((request, responses))
    }

    /// Accepts or revises a vendor's priced response. All checks run in
    /// order against the frozen snapshot; the upserts, the edit counter and
    /// the status write commit as one unit.
    #[instrument(skip(self, token, input), fields(lines = input.items.len()))]
    pub async fn submit_response(
        &self,
        token: &str,
        input: SubmitVendorResponseInput,
    ) -> Result<SubmitVendorResponseOutcome, ServiceError> {
        if !is_valid_token_format(token) {
            return Err(ServiceError::InvalidToken);
        }
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A response needs at least one priced line".to_string(),
            ));
        }
        for line in &input.items {
            if line.unit_price <= 0 {
                return Err(ServiceError::ValidationError(
                    "Unit price must be positive".to_string(),
                ));
            }
        }
        let mut seen = Vec::with_capacity(input.items.len());
        for line in &input.items {
            if seen.contains(&line.snapshot_item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Duplicate line for item {}",
                    line.snapshot_item_id
                )));
            }
            seen.push(line.snapshot_item_id);
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let request = VendorRequestEntity::find()
            .filter(vendor_request::Column::Token.eq(token))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendor request not found".to_string()))?;

        if request.status == VendorRequestStatus::Cancelled {
            return Err(ServiceError::Cancelled);
        }
        if request.status == VendorRequestStatus::Expired {
            return Err(ServiceError::Expired);
        }
        if request.is_expired(now) {
            // Persist the lazily detected expiry, then reject.
            let mut active: vendor_request::ActiveModel = request.into();
            active.status = Set(VendorRequestStatus::Expired);
            active.updated_at = Set(Some(now));
            active.update(&txn).await?;
            txn.commit().await?;
            return Err(ServiceError::Expired);
        }

        let is_edit = request.status == VendorRequestStatus::Responded;
        if is_edit && request.response_edit_count >= request.response_edit_limit {
            return Err(ServiceError::EditLimitExceeded {
                limit: request.response_edit_limit,
            });
        }

        // Lines must come from the snapshot the vendor was shown, never the
        // live quote.
        let snapshot_items = request.snapshot_items()?;
        let snapshot_ids: Vec<Uuid> = snapshot_items.iter().map(|s| s.item_id).collect();
        let offending: Vec<Uuid> = input
            .items
            .iter()
            .map(|l| l.snapshot_item_id)
            .filter(|id| !snapshot_ids.contains(id))
            .collect();
        if !offending.is_empty() {
            return Err(ServiceError::InvalidItems(offending));
        }

        let existing = VendorResponseItemEntity::find()
            .filter(vendor_response_item::Column::VendorRequestId.eq(request.id))
            .all(&txn)
            .await?;

        let mut changed_lines = 0usize;
        for line in &input.items {
            let currency = line
                .currency
                .clone()
                .unwrap_or_else(|| self.default_currency.clone());
            match existing
                .iter()
                .find(|e| e.snapshot_item_id == line.snapshot_item_id)
            {
                Some(previous) => {
                    let candidate = vendor_response_item::Model {
                        id: previous.id,
                        vendor_request_id: previous.vendor_request_id,
                        snapshot_item_id: previous.snapshot_item_id,
                        unit_price: line.unit_price,
                        currency: currency.clone(),
                        lead_time_days: line.lead_time_days,
                        minimum_order_quantity: line.minimum_order_quantity,
                        vendor_sku: line.vendor_sku.clone(),
                        notes: line.notes.clone(),
                        created_at: previous.created_at,
                        updated_at: previous.updated_at,
                    };
                    if previous.same_values(&candidate) {
                        continue;
                    }
                    changed_lines += 1;
                    let mut active: vendor_response_item::ActiveModel = candidate.into();
                    active.updated_at = Set(Some(now));
                    // The primary key is unchanged; everything else is the
                    // submitted value.
                    active.reset(vendor_response_item::Column::UnitPrice);
                    active.reset(vendor_response_item::Column::Currency);
                    active.reset(vendor_response_item::Column::LeadTimeDays);
                    active.reset(vendor_response_item::Column::MinimumOrderQuantity);
                    active.reset(vendor_response_item::Column::VendorSku);
                    active.reset(vendor_response_item::Column::Notes);
                    active.update(&txn).await?;
                }
                None => {
                    changed_lines += 1;
                    let model = vendor_response_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        vendor_request_id: Set(request.id),
                        snapshot_item_id: Set(line.snapshot_item_id),
                        unit_price: Set(line.unit_price),
                        currency: Set(currency),
                        lead_time_days: Set(line.lead_time_days),
                        minimum_order_quantity: Set(line.minimum_order_quantity),
                        vendor_sku: Set(line.vendor_sku.clone()),
                        notes: Set(line.notes.clone()),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    };
                    model.insert(&txn).await?;
                }
            }
        }

        let request_id = request.id;
        let quote_id = request.quote_id;
        let edit_limit = request.response_edit_limit;
        let new_edit_count = if is_edit {
            request.response_edit_count + 1
        } else {
            request.response_edit_count
        };

        let mut active: vendor_request::ActiveModel = request.into();
        if is_edit {
            active.response_edit_count = Set(new_edit_count);
        } else {
            active.status = Set(VendorRequestStatus::Responded);
            active.responded_at = Set(Some(now));
        }
        if let Some(vendor_name) = &input.vendor_name {
            active.vendor_name = Set(vendor_name.clone());
        }
        active.updated_at = Set(Some(now));
        active.update(&txn).await?;

        // First response also moves the owning quote forward.
        let mut quote_status_change: Option<(QuoteStatus, QuoteStatus)> = None;
        if !is_edit {
            let quote = QuoteEntity::find_by_id(quote_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;
            if quote.status == QuoteStatus::Sent {
                let old = quote.status;
                let mut active: quote::ActiveModel = quote.into();
                active.status = Set(QuoteStatus::Responded);
                active.updated_at = Set(Some(now));
                active.update(&txn).await?;
                quote_status_change = Some((old, QuoteStatus::Responded));
            }
        }

        txn.commit().await?;

        info!(
            vendor_request_id = %request_id,
            is_edit = is_edit,
            edit_count = new_edit_count,
            changed_lines = changed_lines,
            "Vendor response recorded"
        );

        if let Some((old, new)) = quote_status_change {
            self.dispatch(Event::QuoteStatusChanged {
                quote_id,
                old_status: old.to_string(),
                new_status: new.to_string(),
            })
            .await;
        }
        self.dispatch(Event::VendorResponseSubmitted {
            vendor_request_id: request_id,
            quote_id,
            is_edit,
        })
        .await;

        Ok(SubmitVendorResponseOutcome {
            vendor_request_id: request_id,
            is_edit,
            edit_count: new_edit_count,
            edit_limit,
            changed_lines,
        })
    }

    /// Withdraws an outstanding request so its token stops accepting
    /// responses.
    #[instrument(skip(self), fields(request_id = %request_id, user_id = %user.user_id))]
    pub async fn cancel_request(
        &self,
        user: &CurrentUser,
        request_id: Uuid,
    ) -> Result<vendor_request::Model, ServiceError> {
        let request = VendorRequestEntity::find_by_id(request_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Vendor request {} not found", request_id))
            })?;

        let quote = QuoteEntity::find_by_id(request.quote_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Quote {} not found", request.quote_id))
            })?;
        if quote.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Quote belongs to another user".to_string(),
            ));
        }

        if request.status != VendorRequestStatus::Sent {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot cancel a vendor request in status {}",
                request.status
            )));
        }

        let mut active: vendor_request::ActiveModel = request.into();
        active.status = Set(VendorRequestStatus::Cancelled);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(self.db.as_ref()).await?;

        info!(vendor_request_id = %updated.id, "Vendor request cancelled");
        Ok(updated)
    }

    async fn dispatch(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.dispatch(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_pass_the_format_check() {
        for _ in 0..16 {
            let token = generate_response_token();
            assert!(is_valid_token_format(&token), "bad token: {}", token);
        }
    }

    #[test]
    fn generated_tokens_are_distinct() {
        let a = generate_response_token();
        let b = generate_response_token();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(!is_valid_token_format(""));
        assert!(!is_valid_token_format("vrt_"));
        assert!(!is_valid_token_format("vrt_short"));
        assert!(!is_valid_token_format(&format!(
            "xxx_{}",
            "a".repeat(RESPONSE_TOKEN_RANDOM_LEN)
        )));
        // Right length, illegal characters.
        assert!(!is_valid_token_format(&format!(
            "vrt_{}!",
            "a".repeat(RESPONSE_TOKEN_RANDOM_LEN - 1)
        )));
        // Quote ids must never work as lookup keys.
        assert!(!is_valid_token_format(
            "6f2c9f5e-8e9c-4a7a-9d3e-2b1a0c9d8e7f"
        ));
    }

    #[test]
    fn token_format_accepts_exact_shape() {
        assert!(is_valid_token_format(&format!(
            "vrt_{}",
            "aB3x".repeat(RESPONSE_TOKEN_RANDOM_LEN / 4)
        )));
    }
}
