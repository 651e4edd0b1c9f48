//! Label generation workflow.
//!
//! A durable `pending` shipment row is written before the first broker
//! call, so a crash mid-workflow leaves an auditable record instead of a
//! silent loss. Every broker failure lands on that row as `failed` with
//! the broker's message, and is returned to the caller as a typed error.

use chrono::Utc;
use common::{OrderId, ShipmentId};
use domain::{OrderStatus, Shipment};
use store::Store;

use crate::adapters::{LabelBroker, PaymentGateway};
use crate::error::{OrchestratorError, Result};
use crate::notify::{Notification, Notifier};
use crate::orchestrator::Orchestrator;

impl<S, P, L, N> Orchestrator<S, P, L, N>
where
    S: Store,
    P: PaymentGateway,
    L: LabelBroker,
    N: Notifier,
{
    /// Purchases a shipping label for an order.
    ///
    /// Idempotent: when a purchased shipment already exists for the order
    /// it is returned as-is, with no second broker purchase. On success
    /// the parent order gets the tracking number, and advances to
    /// `processing` when it was still `pending` or `paid` — a label
    /// purchase never downgrades an order that is further along.
    #[tracing::instrument(skip(self))]
    pub async fn generate_label(&self, order_id: OrderId) -> Result<Shipment> {
        let order = self.require_order(order_id).await?;

        if let Some(existing) = self.store.find_purchased_shipment(order_id).await? {
            tracing::info!(%order_id, shipment_id = %existing.id, "label already purchased, reusing");
            return Ok(existing);
        }

        let origin = self.policy.origin_address.clone().ok_or_else(|| {
            OrchestratorError::Configuration(
                "shipping origin address is not configured".to_string(),
            )
        })?;

        // Carrier APIs reject malformed destinations; clean defensively.
        let destination = order.shipping_address.normalized();

        let items = self.store.get_order_items(order_id).await?;
        let total_quantity: u32 = items.iter().map(|item| item.quantity).sum();
        let parcel = self.policy.parcel_for(total_quantity);

        // Durable breadcrumb before the first external call.
        let mut shipment = Shipment::pending(
            ShipmentId::new(),
            order_id,
            origin.clone(),
            destination.clone(),
            parcel.clone(),
            Utc::now(),
        );
        self.store.insert_shipment(shipment.clone()).await?;

        let quote = match self
            .broker
            .create_shipment(&origin, &destination, &parcel)
            .await
        {
            Ok(quote) => quote,
            Err(err) => return self.fail_shipment(shipment, err).await,
        };
        shipment.mark_created(quote.shipment_id.clone())?;
        self.store.update_shipment(&shipment).await?;

        let rate = match self.policy.select_rate(&quote.rates) {
            Ok(rate) => rate.clone(),
            Err(err) => return self.fail_shipment(shipment, err).await,
        };

        let purchase = match self.broker.purchase_label(&rate.rate_id).await {
            Ok(purchase) => purchase,
            Err(err) => return self.fail_shipment(shipment, err).await,
        };

        shipment.mark_purchased(
            rate.carrier.clone(),
            rate.service.clone(),
            rate.amount,
            rate.rate_id.clone(),
            purchase.transaction_id.clone(),
            purchase.tracking_number.clone(),
            purchase.label_url.clone(),
        )?;
        self.store.update_shipment(&shipment).await?;

        self.store
            .set_order_tracking(order_id, &purchase.tracking_number)
            .await?;
        if matches!(order.status, OrderStatus::Pending | OrderStatus::Paid) {
            self.store
                .update_order_status(order_id, OrderStatus::Processing)
                .await?;
        }

        metrics::counter!("labels_purchased_total").increment(1);
        tracing::info!(
            %order_id,
            shipment_id = %shipment.id,
            carrier = %rate.carrier,
            cost = %rate.amount,
            "label purchased"
        );

        self.dispatcher
            .dispatch(
                &order.contact.email,
                Notification::ShipmentConfirmed {
                    order_number: order.order_number.clone(),
                    carrier: rate.carrier.clone(),
                    tracking_number: purchase.tracking_number.clone(),
                },
            )
            .await;

        Ok(shipment)
    }

    /// Records a workflow failure on the shipment row and re-surfaces the
    /// error. The row is the audit trail; losing the persistence of the
    /// failure itself is only logged, the original error wins.
    async fn fail_shipment(
        &self,
        mut shipment: Shipment,
        err: OrchestratorError,
    ) -> Result<Shipment> {
        shipment.mark_failed(err.to_string());
        if let Err(persist_err) = self.store.update_shipment(&shipment).await {
            tracing::error!(
                shipment_id = %shipment.id,
                error = %persist_err,
                "failed to record shipment failure"
            );
        }
        metrics::counter!("labels_failed_total").increment(1);
        tracing::warn!(shipment_id = %shipment.id, error = %err, "label generation failed");
        Err(err)
    }
}
