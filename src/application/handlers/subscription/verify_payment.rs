//! VerifyPaymentHandler - Command handler for client-submitted payment confirmations.

use std::sync::Arc;

use secrecy::SecretString;

use crate::application::keyed_lock::{KeyedLocks, SubscriptionKey};
use crate::domain::billing::{
    BillingError, ChargeKind, PendingCharge, SignatureVerifier, SubscriptionRecord,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::tenant::{PlanDefinition, PlanType, TenantDirectory, TenantId};
use crate::ports::{PendingChargeRepository, SubscriptionLedger};

/// A lost optimistic race is retried once before surfacing.
const MAX_WRITE_ATTEMPTS: u32 = 2;

/// The gateway object the client paid against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReference {
    Order(String),
    Subscription(String),
}

impl PaymentReference {
    pub fn external_id(&self) -> &str {
        match self {
            PaymentReference::Order(id) | PaymentReference::Subscription(id) => id,
        }
    }

    pub fn kind(&self) -> ChargeKind {
        match self {
            PaymentReference::Order(_) => ChargeKind::OneTime,
            PaymentReference::Subscription(_) => ChargeKind::Recurring,
        }
    }

    fn signature_matches(&self, payment_id: &str, signature: &str, secret: &SecretString) -> bool {
        match self {
            PaymentReference::Order(id) => {
                SignatureVerifier::verify_order_payment(id, payment_id, signature, secret)
            }
            PaymentReference::Subscription(id) => {
                SignatureVerifier::verify_subscription_payment(id, payment_id, signature, secret)
            }
        }
    }
}

/// Command to confirm a payment the client completed at the gateway.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub tenant_id: String,
    pub user_id: UserId,
    pub reference: PaymentReference,
    pub payment_id: String,
    pub signature: String,
    /// Plan the client believes it bought. Must match the pending charge.
    pub plan_type: Option<PlanType>,
}

/// Result of payment verification.
#[derive(Debug, Clone)]
pub struct VerifyPaymentResult {
    pub record: SubscriptionRecord,
    /// True when this payment had already been applied by an earlier call.
    pub already_applied: bool,
}

/// Handler for payment verification.
///
/// Only identifiers recorded by `StartChargeHandler` are trusted. The ledger
/// write runs under the per-(tenant, user) lock and a conditional update.
pub struct VerifyPaymentHandler {
    directory: TenantDirectory,
    ledger: Arc<dyn SubscriptionLedger>,
    pending_charges: Arc<dyn PendingChargeRepository>,
    locks: Arc<KeyedLocks<SubscriptionKey>>,
}

impl VerifyPaymentHandler {
    pub fn new(
        directory: TenantDirectory,
        ledger: Arc<dyn SubscriptionLedger>,
        pending_charges: Arc<dyn PendingChargeRepository>,
        locks: Arc<KeyedLocks<SubscriptionKey>>,
    ) -> Self {
        Self {
            directory,
            ledger,
            pending_charges,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, BillingError> {
        let tenant = self.directory.resolve(&cmd.tenant_id)?;
        let external_id = cmd.reference.external_id();
        if external_id.trim().is_empty() || cmd.payment_id.trim().is_empty() {
            return Err(BillingError::Validation(
                "payment reference and payment id are required".to_string(),
            ));
        }

        let _guard = self
            .locks
            .lock((tenant.tenant_id.clone(), cmd.user_id.clone()))
            .await;

        // 1. Only charges this service created for this user are trusted
        let charge = match self
            .pending_charges
            .find(&tenant.tenant_id, external_id)
            .await?
        {
            Some(charge)
                if charge.belongs_to(&tenant.tenant_id, &cmd.user_id)
                    && charge.kind == cmd.reference.kind() =>
            {
                charge
            }
            Some(_) => {
                tracing::warn!(
                    tenant_id = %tenant.tenant_id,
                    user_id = %cmd.user_id,
                    external_id,
                    "Pending charge does not belong to caller"
                );
                return Err(BillingError::UnknownCharge(external_id.to_string()));
            }
            None => {
                return self
                    .replay(&tenant.tenant_id, &tenant.credentials.key_secret, &cmd)
                    .await
            }
        };

        // 2. Signature before any ledger mutation
        if !cmd.reference.signature_matches(
            &cmd.payment_id,
            &cmd.signature,
            &tenant.credentials.key_secret,
        ) {
            tracing::warn!(
                security_event = true,
                tenant_id = %tenant.tenant_id,
                user_id = %cmd.user_id,
                external_id,
                "Payment signature verification failed"
            );
            return Err(BillingError::InvalidSignature);
        }

        if let Some(claimed) = cmd.plan_type {
            if claimed != charge.plan_type {
                return Err(BillingError::Validation(format!(
                    "plan {} does not match the pending charge",
                    claimed
                )));
            }
        }
        let plan = self
            .directory
            .resolve_plan(&cmd.tenant_id, charge.plan_type)?;

        // 3. Create or update the record
        let record = self
            .apply(&tenant.tenant_id, &cmd.user_id, &plan, &charge, &cmd.payment_id)
            .await?;

        // 4. Consume the pending charge; a leftover row only expires later
        if let Err(err) = self
            .pending_charges
            .consume(&tenant.tenant_id, external_id)
            .await
        {
            tracing::warn!(
                tenant_id = %tenant.tenant_id,
                external_id,
                error = %err,
                "Failed to consume pending charge"
            );
        }

        tracing::info!(
            tenant_id = %tenant.tenant_id,
            user_id = %cmd.user_id,
            plan_type = %record.plan_type,
            status = %record.status,
            payment_id = %cmd.payment_id,
            "Payment verified"
        );

        Ok(VerifyPaymentResult {
            record,
            already_applied: false,
        })
    }

    async fn apply(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
        plan: &PlanDefinition,
        charge: &PendingCharge,
        payment_id: &str,
    ) -> Result<SubscriptionRecord, BillingError> {
        let mut attempt = 1;
        loop {
            let now = Timestamp::now();
            let write = match self.ledger.find(tenant_id, user_id).await? {
                None => {
                    let record = SubscriptionRecord::activated(
                        tenant_id.clone(),
                        user_id.clone(),
                        plan,
                        charge.kind,
                        &charge.external_id,
                        payment_id,
                        now,
                    );
                    self.ledger.insert(&record).await
                }
                Some(record) if record.last_payment_external_id.as_deref() == Some(payment_id) => {
                    return Ok(record);
                }
                Some(mut record) => {
                    if plan.plan_type.is_trial() && record.trial_used {
                        tracing::warn!(
                            tenant_id = %tenant_id,
                            user_id = %user_id,
                            payment_id,
                            "Verified trial payment for a user whose trial is already used"
                        );
                        return Err(BillingError::TrialAlreadyUsed);
                    }
                    record.apply_verified_payment(
                        plan,
                        charge.kind,
                        &charge.external_id,
                        payment_id,
                        now,
                    );
                    self.ledger.update(&record).await
                }
            };

            match write {
                Ok(saved) => return Ok(saved),
                Err(err) if err.is_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        user_id = %user_id,
                        attempt,
                        "Ledger conflict, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The pending charge is gone. If the caller's record already carries this
    /// payment and the signature holds, report it as applied.
    async fn replay(
        &self,
        tenant_id: &TenantId,
        secret: &SecretString,
        cmd: &VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, BillingError> {
        let applied = self
            .ledger
            .find(tenant_id, &cmd.user_id)
            .await?
            .filter(|r| r.last_payment_external_id.as_deref() == Some(cmd.payment_id.as_str()));

        match applied {
            Some(record)
                if cmd
                    .reference
                    .signature_matches(&cmd.payment_id, &cmd.signature, secret) =>
            {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    user_id = %cmd.user_id,
                    payment_id = %cmd.payment_id,
                    "Payment already applied"
                );
                Ok(VerifyPaymentResult {
                    record,
                    already_applied: true,
                })
            }
            _ => Err(BillingError::UnknownCharge(
                cmd.reference.external_id().to_string(),
            )),
        }
    }
}
