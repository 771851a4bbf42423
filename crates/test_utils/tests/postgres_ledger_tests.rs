//! PostgreSQL ledger integration tests
//!
//! Each test starts its own container. Run with `cargo test -- --ignored`
//! on a machine with docker.

use std::time::Duration;

use rust_decimal_macros::dec;

use domain_billing::{
    BarrelFilter, BillingError, BillingService, InvoiceQuery, LedgerStore, LedgerTransaction,
    RejectionKind,
};
use test_utils::{
    assert_amount_eq, assert_provider_open, assert_rejected, db_test, BarrelBuilder,
    InvoiceBuilder, SeededProvider,
};

mod line_factory_tests {
    use super::*;

    db_test!(test_full_barrel_scenario, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[100, 50]).await.unwrap();

        service.add_line(seeded.full_line(0).build()).await.unwrap();
        assert_rejected(
            service.add_line(seeded.full_line(1).with_liters(25).build()).await,
            RejectionKind::PartialQuantityRejected,
        );
        service.add_line(seeded.full_line(1).build()).await.unwrap();

        let summary = service.get_invoice(seeded.invoice.id).await.unwrap();
        assert_amount_eq(&summary.total_amount, dec!(375.00));

        let provider = service.provider_summary(seeded.provider.id).await.unwrap();
        assert_provider_open(&provider, 0);
        assert_eq!(provider.billed_barrels.len(), 2);
    });

    db_test!(test_second_line_is_already_billed, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();
        let other_invoice = service
            .create_invoice(InvoiceBuilder::new(seeded.provider.id).build())
            .await
            .unwrap();

        service.add_line(seeded.full_line(0).build()).await.unwrap();

        let mut again = seeded.full_line(0).build();
        again.invoice_id = other_invoice.id;
        assert_rejected(service.add_line(again).await, RejectionKind::BarrelAlreadyBilled);
    });

    db_test!(test_provider_mismatch, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();
        let other = SeededProvider::create(&service, &[100]).await.unwrap();

        let mut request = seeded.full_line(0).build();
        request.barrel_id = other.barrels[0].id;
        assert_rejected(service.add_line(request).await, RejectionKind::ProviderMismatch);
    });

    db_test!(test_unknown_ids_are_not_found, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();

        let mut request = seeded.full_line(0).build();
        request.barrel_id = core_kernel::BarrelId::new();
        let result = service.add_line(request).await;
        assert!(matches!(result, Err(BillingError::BarrelNotFound(_))));

        let mut request = seeded.full_line(0).build();
        request.invoice_id = core_kernel::InvoiceId::new();
        let result = service.add_line(request).await;
        assert!(matches!(result, Err(BillingError::InvoiceNotFound(_))));
    });

    db_test!(test_deleting_invoice_releases_barrel, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[80]).await.unwrap();
        service.add_line(seeded.full_line(0).build()).await.unwrap();

        service.delete_invoice(seeded.invoice.id).await.unwrap();

        let status = service.get_barrel(seeded.barrels[0].id).await.unwrap();
        assert!(!status.billed());
        assert_provider_open(&service.provider_summary(seeded.provider.id).await.unwrap(), 80);
    });
}

mod concurrency_tests {
    use super::*;

    db_test!(test_concurrent_add_line_bills_barrel_once, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();

        let mut invoices = Vec::new();
        for _ in 0..6 {
            let invoice = service
                .create_invoice(InvoiceBuilder::new(seeded.provider.id).build())
                .await
                .unwrap();
            invoices.push(invoice);
        }

        let mut handles = Vec::new();
        for invoice in &invoices {
            let service = service.clone();
            let mut request = seeded.full_line(0).build();
            request.invoice_id = invoice.id;
            handles.push(tokio::spawn(async move { service.add_line(request).await }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert_eq!(e.rejection_kind(), Some(RejectionKind::BarrelAlreadyBilled)),
            }
        }
        assert_eq!(accepted, 1);

        let billed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice_lines WHERE barrel_id = $1")
            .bind(uuid::Uuid::from(seeded.barrels[0].id))
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(billed, 1);
    });

    db_test!(test_barrel_lock_blocks_only_that_barrel, |db| {
        let store = db.store();
        let service = BillingService::new(store.clone());
        let seeded = SeededProvider::create(&service, &[100, 100]).await.unwrap();

        let mut holder = store.begin().await.unwrap();
        holder.lock_barrel(seeded.barrels[0].id).await.unwrap().unwrap();

        // Other barrel is free
        let other = tokio::time::timeout(
            Duration::from_secs(5),
            service.add_line(seeded.full_line(1).build()),
        )
        .await
        .expect("unrelated barrel must not wait");
        assert!(other.is_ok());

        // Locked barrel waits until the holder goes away
        let blocked = tokio::time::timeout(
            Duration::from_millis(300),
            service.add_line(seeded.full_line(0).build()),
        )
        .await;
        assert!(blocked.is_err());

        drop(holder);
        service.add_line(seeded.full_line(0).build()).await.unwrap();
    });

    db_test!(test_invoice_delete_waits_for_line_transaction, |db| {
        let store = db.store();
        let service = BillingService::new(store.clone());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let invoice = tx.get_invoice(seeded.invoice.id).await.unwrap().unwrap();
        let barrel = tx.lock_barrel(seeded.barrels[0].id).await.unwrap().unwrap();

        let deleter = {
            let service = service.clone();
            tokio::spawn(async move { service.delete_invoice(invoice.id).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!deleter.is_finished(), "invoice delete must wait for the line transaction");

        let line = domain_billing::InvoiceLine {
            id: core_kernel::InvoiceLineId::new_v7(),
            invoice_id: invoice.id,
            barrel_id: barrel.id,
            liters: barrel.liters,
            description: "Cosecha temprana".to_string(),
            unit_price: core_kernel::UnitPrice::new(dec!(2.50)).unwrap(),
        };
        tx.insert_line(&line).await.unwrap();
        tx.commit().await.unwrap();

        deleter.await.unwrap().unwrap();
        assert!(!service.get_barrel(barrel.id).await.unwrap().billed());
    });

    db_test!(test_line_for_missing_invoice_is_not_found, |db| {
        let store = db.store();
        let service = BillingService::new(store.clone());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let barrel = tx.lock_barrel(seeded.barrels[0].id).await.unwrap().unwrap();
        let line = domain_billing::InvoiceLine {
            id: core_kernel::InvoiceLineId::new_v7(),
            invoice_id: core_kernel::InvoiceId::new_v7(),
            barrel_id: barrel.id,
            liters: barrel.liters,
            description: "Cosecha temprana".to_string(),
            unit_price: core_kernel::UnitPrice::new(dec!(2.50)).unwrap(),
        };

        let err = tx.insert_line(&line).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    });

    db_test!(test_uncommitted_line_is_rolled_back, |db| {
        let store = db.store();
        let service = BillingService::new(store.clone());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let barrel = tx.lock_barrel(seeded.barrels[0].id).await.unwrap().unwrap();
            let line = domain_billing::InvoiceLine {
                id: core_kernel::InvoiceLineId::new_v7(),
                invoice_id: seeded.invoice.id,
                barrel_id: barrel.id,
                liters: barrel.liters,
                description: "rolled back".to_string(),
                unit_price: core_kernel::UnitPrice::new(dec!(1.00)).unwrap(),
            };
            tx.insert_line(&line).await.unwrap();
            assert_eq!(tx.billed_liters(barrel.id).await.unwrap(), 100);
        }

        assert!(service.invoice_lines(seeded.invoice.id).await.unwrap().is_empty());
        assert!(!service.get_barrel(seeded.barrels[0].id).await.unwrap().billed());
    });
}

mod administration_tests {
    use super::*;

    db_test!(test_duplicate_barrel_number_conflicts, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[]).await.unwrap();

        let request = || BarrelBuilder::new(seeded.provider.id).with_number("B-001").build();
        service.create_barrel(request()).await.unwrap();

        let result = service.create_barrel(request()).await;
        assert!(matches!(result, Err(BillingError::Conflict(_))));
    });

    db_test!(test_delete_protections, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[100]).await.unwrap();
        service.add_line(seeded.full_line(0).build()).await.unwrap();

        let barrel = service.delete_barrel(seeded.barrels[0].id).await;
        assert!(matches!(barrel, Err(BillingError::Conflict(_))));

        let provider = service.delete_provider(seeded.provider.id).await;
        assert!(matches!(provider, Err(BillingError::Conflict(_))));
    });

    db_test!(test_oversized_barrel_rejected, |db| {
        let service = BillingService::new(db.store());
        let seeded = SeededProvider::create(&service, &[domain_billing::BARREL_MAX_LITERS]).await.unwrap();

        let result = service
            .create_barrel(BarrelBuilder::new(seeded.provider.id).with_liters(i64::MAX).build())
            .await;
        assert!(matches!(result, Err(BillingError::Validation(_))));

        let oversized: Result<_, sqlx::Error> = sqlx::query(
            "INSERT INTO barrels (barrel_id, provider_id, number, oil_type, liters) VALUES ($1, $2, 'X', 'EVOO', $3)",
        )
        .bind(uuid::Uuid::now_v7())
        .bind(uuid::Uuid::from(seeded.provider.id))
        .bind(i64::MAX)
        .execute(db.pool())
        .await;
        assert!(oversized.is_err());

        assert_provider_open(
            &service.provider_summary(seeded.provider.id).await.unwrap(),
            domain_billing::BARREL_MAX_LITERS,
        );
    });

    db_test!(test_provider_delete_cascades_barrels, |db| {
        let service = BillingService::new(db.store());
        let provider = service
            .create_provider(test_utils::ProviderBuilder::new().build())
            .await
            .unwrap();
        let barrel = service
            .create_barrel(BarrelBuilder::new(provider.id).build())
            .await
            .unwrap();

        service.delete_provider(provider.id).await.unwrap();

        let result = service.get_barrel(barrel.id).await;
        assert!(matches!(result, Err(BillingError::BarrelNotFound(_))));
    });

    db_test!(test_listing_filters, |db| {
        let service = BillingService::new(db.store());
        let billed = SeededProvider::create(&service, &[100]).await.unwrap();
        let open = SeededProvider::create(&service, &[60, 40]).await.unwrap();
        service.add_line(billed.full_line(0).build()).await.unwrap();

        let open_barrels = service
            .list_barrels(BarrelFilter {
                provider_id: None,
                billed: Some(false),
            })
            .await
            .unwrap();
        assert_eq!(open_barrels.len(), 2);

        let to_bill = service.list_provider_summaries(Some(true)).await.unwrap();
        assert_eq!(to_bill.len(), 1);
        assert_eq!(to_bill[0].provider.id, open.provider.id);
        assert_provider_open(&to_bill[0], 100);

        let done = service.list_provider_summaries(Some(false)).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].provider.id, billed.provider.id);

        let invoices = service
            .find_invoices(&InvoiceQuery::by_provider(open.provider.id))
            .await
            .unwrap();
        assert_eq!(invoices.len(), 1);

        let fragment = &billed.invoice.invoice_no[4..];
        let found = service
            .find_invoices(&InvoiceQuery::default().invoice_no_contains(fragment.to_lowercase()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_amount_eq(&found[0].total_amount, dec!(250.00));
    });
}
