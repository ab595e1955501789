use chrono::{DateTime, Utc};

use salonbook_core::{OwnerId, RecordId};
use salonbook_inventory::{StockAdjustment, StockItem, StockMovement};

use super::WorkflowResult;
use crate::repository::Repository;
use crate::stores::Stores;

pub const TOUCHES: &[&str] = &["inventory", "stock_movements"];

/// Apply a quantity change and persist the item with its movement row.
pub async fn adjust_stock(
    stores: &Stores,
    owner: OwnerId,
    item_id: RecordId,
    adjustment: StockAdjustment,
    at: DateTime<Utc>,
) -> WorkflowResult<(StockItem, StockMovement)> {
    let tx = stores.begin().await?;
    let s = tx.stores();
    let mut item = s.inventory.require(owner, item_id).await?;
    let movement = item.adjust(adjustment, at)?;
    let item = s.inventory.update(item).await?;
    let movement = s.stock_movements.insert(movement).await?;
    tx.commit().await?;
    if item.is_low_stock() {
        tracing::info!(item_id = %item.id, quantity = item.quantity, "item at or below reorder level");
    }
    Ok((item, movement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use salonbook_core::DomainError;
    use salonbook_inventory::{MovementKind, StockItemDraft};

    use crate::repository::ListQuery;
    use crate::workflows::WorkflowError;

    #[tokio::test]
    async fn adjustment_persists_item_and_movement() {
        let stores = Stores::in_memory();
        let owner = OwnerId::new();
        let item = StockItem::create(
            owner,
            StockItemDraft { name: "Shampoo".into(), quantity: 4, reorder_level: 1, ..Default::default() },
            Utc::now(),
        )
        .unwrap();
        stores.inventory.insert(item.clone()).await.unwrap();

        let (updated, movement) = adjust_stock(
            &stores,
            owner,
            item.id,
            StockAdjustment { delta: -3, kind: MovementKind::Usage, reason: Some("wash station".into()) },
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(updated.quantity, 1);
        assert_eq!(movement.quantity_after, 1);

        let movements = stores
            .stock_movements
            .list(owner, &ListQuery::new().filter("item_id", item.id.to_string()))
            .await
            .unwrap();
        assert_eq!(movements.total, 1);

        let err = adjust_stock(
            &stores,
            owner,
            item.id,
            StockAdjustment { delta: -2, kind: MovementKind::Sale, reason: None },
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(stores.inventory.require(owner, item.id).await.unwrap().quantity, 1);
    }
}
