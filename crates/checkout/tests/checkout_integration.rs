//! Integration tests for checkout over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use checkout::{CheckoutConfig, CheckoutError, CheckoutOrchestrator, ErrorKind};
use domain::{CartLine, CategoryId, CustomerId, Money, Product, ProductId};
use futures_util::future::join_all;
use store::{InMemoryStore, Store, StoreExt};

struct TestHarness {
    orchestrator: Arc<CheckoutOrchestrator<InMemoryStore>>,
    store: InMemoryStore,
}

impl TestHarness {
    async fn new(products: &[(&str, i64, u32)]) -> Self {
        Self::with_store(InMemoryStore::new(), products).await
    }

    async fn with_store(store: InMemoryStore, products: &[(&str, i64, u32)]) -> Self {
        for (id, cents, stock) in products {
            store
                .insert_product(Product::new(
                    *id,
                    format!("Product {id}"),
                    Money::from_cents(*cents),
                    *stock,
                    CategoryId::new("general"),
                ))
                .await;
        }

        let config = CheckoutConfig::default().with_retry_backoff(Duration::from_millis(1));
        Self {
            orchestrator: Arc::new(CheckoutOrchestrator::with_config(store.clone(), config)),
            store,
        }
    }

    async fn stock(&self, id: &str) -> u32 {
        self.store
            .stock_of(&ProductId::new(id))
            .await
            .unwrap()
            .unwrap()
    }
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_two_products_total_26_97() {
        let h = TestHarness::new(&[("A", 999, 10), ("B", 699, 10)]).await;
        let customer_id = CustomerId::new();

        let receipt = h
            .orchestrator
            .checkout(
                customer_id,
                "42 Wallaby Way",
                &[CartLine::new("A", 2), CartLine::new("B", 1)],
            )
            .await
            .unwrap();

        assert_eq!(receipt.total_amount, Money::from_cents(2697));
        assert_eq!(h.stock("A").await, 8);
        assert_eq!(h.stock("B").await, 9);

        let (order, lines) = h
            .store
            .get_order_with_lines(receipt.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.customer_id, customer_id);
        assert_eq!(order.shipping_address, "42 Wallaby Way");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, ProductId::new("A"));
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].unit_price, Money::from_cents(999));
        assert_eq!(lines[1].product_id, ProductId::new("B"));
        assert_eq!(lines[1].quantity, 1);
        assert_eq!(lines[1].unit_price, Money::from_cents(699));
    }

    #[tokio::test]
    async fn test_quantity_beyond_stock_changes_nothing() {
        let h = TestHarness::new(&[("A", 999, 50)]).await;

        let err = h
            .orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 100)])
            .await
            .unwrap_err();

        match err {
            CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, ProductId::new("A"));
                assert_eq!(requested, 100);
                assert_eq!(available, 50);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.stock("A").await, 50);
        assert_eq!(h.store.order_count().await, 0);
        assert_eq!(h.store.order_line_count().await, 0);
    }

    #[tokio::test]
    async fn test_exact_stock_is_allowed() {
        let h = TestHarness::new(&[("A", 100, 3)]).await;
        h.orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 3)])
            .await
            .unwrap();
        assert_eq!(h.stock("A").await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_product_lines_draw_from_the_same_stock() {
        let h = TestHarness::new(&[("A", 100, 5)]).await;

        let err = h
            .orchestrator
            .checkout(
                CustomerId::new(),
                "x",
                &[CartLine::new("A", 3), CartLine::new("A", 3)],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { requested: 3, available: 2, .. }
        ));
        assert_eq!(h.stock("A").await, 5);

        let receipt = h
            .orchestrator
            .checkout(
                CustomerId::new(),
                "x",
                &[CartLine::new("A", 2), CartLine::new("A", 3)],
            )
            .await
            .unwrap();
        assert_eq!(h.stock("A").await, 0);
        assert_eq!(
            h.store.get_order_lines(receipt.order_id).await.unwrap().len(),
            2
        );
    }
}

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn test_failing_second_line_of_three_leaves_no_trace() {
        let h = TestHarness::new(&[("A", 100, 10), ("B", 100, 1), ("C", 100, 10)]).await;

        let err = h
            .orchestrator
            .checkout(
                CustomerId::new(),
                "x",
                &[
                    CartLine::new("A", 2),
                    CartLine::new("B", 5),
                    CartLine::new("C", 1),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
        assert_eq!(h.stock("A").await, 10);
        assert_eq!(h.stock("B").await, 1);
        assert_eq!(h.stock("C").await, 10);
        assert_eq!(h.store.order_count().await, 0);
        assert_eq!(h.store.order_line_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_aborts_whole_cart() {
        let h = TestHarness::new(&[("A", 100, 10)]).await;

        let err = h
            .orchestrator
            .checkout(
                CustomerId::new(),
                "x",
                &[CartLine::new("A", 1), CartLine::new("ghost", 1)],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ProductNotFound(ref id) if *id == ProductId::new("ghost")));
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(h.stock("A").await, 10);
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_first_failing_line_in_submitted_order_is_reported() {
        // Locks are taken a before z, but reservation follows the cart.
        let h = TestHarness::new(&[("a", 100, 0), ("z", 100, 0)]).await;

        let err = h
            .orchestrator
            .checkout(
                CustomerId::new(),
                "x",
                &[CartLine::new("z", 1), CartLine::new("a", 1)],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { ref product_id, .. } if *product_id == ProductId::new("z")
        ));
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_empty_cart_touches_no_storage() {
        let h = TestHarness::new(&[("A", 100, 10)]).await;
        h.store.fail_next_begins(1);

        let err = h
            .orchestrator
            .checkout(CustomerId::new(), "x", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(err.kind(), ErrorKind::Validation);

        // The injected begin failure was never consumed.
        assert!(h.store.begin().await.is_err());
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_rejected_before_stock_is_read() {
        let h = TestHarness::new(&[("A", 100, 10)]).await;

        for quantity in [0, -1] {
            let err = h
                .orchestrator
                .checkout(
                    CustomerId::new(),
                    "x",
                    &[CartLine::new("A", 1), CartLine::new("ghost", quantity)],
                )
                .await
                .unwrap_err();
            assert!(
                matches!(err, CheckoutError::InvalidQuantity { quantity: q, .. } if q == quantity)
            );
        }
        assert_eq!(h.stock("A").await, 10);
    }
}

mod retries {
    use super::*;

    #[tokio::test]
    async fn test_single_commit_failure_is_retried() {
        let h = TestHarness::new(&[("A", 999, 10)]).await;
        h.store.fail_next_commits(1);

        let receipt = h
            .orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 2)])
            .await
            .unwrap();

        assert_eq!(h.stock("A").await, 8);
        assert_eq!(h.store.order_count().await, 1);
        assert!(h.store.get_order(receipt.order_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_two_commit_failures_surface_transient() {
        let h = TestHarness::new(&[("A", 999, 10)]).await;
        h.store.fail_next_commits(2);

        let err = h
            .orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 2)])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(h.stock("A").await, 10);
        assert_eq!(h.store.order_count().await, 0);
        assert_eq!(h.store.order_line_count().await, 0);
    }

    #[tokio::test]
    async fn test_begin_failure_is_retried() {
        let h = TestHarness::new(&[("A", 999, 10)]).await;
        h.store.fail_next_begins(1);

        h.orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 1)])
            .await
            .unwrap();
        assert_eq!(h.stock("A").await, 9);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let h = TestHarness::new(&[("A", 999, 1)]).await;

        let err = h
            .orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 2)])
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_lock_timeout_is_transient_and_leaves_holder_untouched() {
        let store = InMemoryStore::new().with_lock_timeout(Duration::from_millis(20));
        let h = TestHarness::with_store(store, &[("A", 999, 10)]).await;

        let mut holder = h.store.begin().await.unwrap();
        holder.lock_products(&[ProductId::new("A")]).await.unwrap();

        let err = h
            .orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);

        holder.rollback().await.unwrap();
        assert_eq!(h.stock("A").await, 10);

        h.orchestrator
            .checkout(CustomerId::new(), "x", &[CartLine::new("A", 1)])
            .await
            .unwrap();
        assert_eq!(h.stock("A").await, 9);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_checkouts_cannot_oversell() {
        let h = TestHarness::new(&[("A", 100, 5)]).await;

        let tasks = (0..2).map(|_| {
            let orchestrator = Arc::clone(&h.orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .checkout(CustomerId::new(), "x", &[CartLine::new("A", 3)])
                    .await
            })
        });
        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let committed = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(committed, 1);
        let rejected = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(CheckoutError::InsufficientStock {
                        requested: 3,
                        available: 2,
                        ..
                    })
                )
            })
            .count();
        assert_eq!(rejected, 1);
        assert_eq!(h.stock("A").await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_cart_orders_do_not_deadlock() {
        let h = TestHarness::new(&[("A", 100, 1000), ("B", 100, 1000)]).await;

        let tasks = (0..40).map(|i| {
            let orchestrator = Arc::clone(&h.orchestrator);
            let lines = if i % 2 == 0 {
                vec![CartLine::new("A", 1), CartLine::new("B", 1)]
            } else {
                vec![CartLine::new("B", 1), CartLine::new("A", 1)]
            };
            tokio::spawn(async move {
                orchestrator
                    .checkout(CustomerId::new(), "x", &lines)
                    .await
            })
        });

        let results = tokio::time::timeout(Duration::from_secs(10), join_all(tasks))
            .await
            .expect("checkouts deadlocked");
        assert!(results.into_iter().all(|r| r.unwrap().is_ok()));
        assert_eq!(h.stock("A").await, 960);
        assert_eq!(h.stock("B").await, 960);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stock_is_conserved_across_mixed_checkouts() {
        let h = TestHarness::new(&[("A", 250, 30), ("B", 125, 20)]).await;
        let customer_id = CustomerId::new();

        let tasks = (0..25u32).map(|i| {
            let orchestrator = Arc::clone(&h.orchestrator);
            let lines = match i % 3 {
                0 => vec![CartLine::new("A", i64::from(i % 4 + 1))],
                1 => vec![CartLine::new("B", 2), CartLine::new("A", 1)],
                _ => vec![CartLine::new("B", i64::from(i % 5 + 1))],
            };
            tokio::spawn(async move { orchestrator.checkout(customer_id, "x", &lines).await })
        });
        join_all(tasks).await;

        let orders = h
            .store
            .list_orders_for_customer(customer_id, usize::MAX)
            .await
            .unwrap();
        let mut sold_a = 0;
        let mut sold_b = 0;
        for order in &orders {
            let lines = h.store.get_order_lines(order.id).await.unwrap();
            let line_sum: Money = lines.iter().map(|l| l.subtotal()).sum();
            assert_eq!(order.total_amount, line_sum.round_to_minor_units());
            for line in lines {
                match line.product_id.as_str() {
                    "A" => sold_a += line.quantity,
                    "B" => sold_b += line.quantity,
                    other => panic!("unexpected product {other}"),
                }
            }
        }

        assert_eq!(h.stock("A").await, 30 - sold_a);
        assert_eq!(h.stock("B").await, 20 - sold_b);
    }
}

mod cancellation {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_aborted_checkout_releases_locks_and_writes_nothing() {
        let store = InMemoryStore::new().with_lock_timeout(Duration::from_secs(5));
        let h = TestHarness::with_store(store, &[("A", 100, 10), ("B", 100, 10)]).await;

        // Hold B so the checkout locks A and then blocks on B.
        let mut holder = h.store.begin().await.unwrap();
        holder.lock_products(&[ProductId::new("B")]).await.unwrap();

        let orchestrator = Arc::clone(&h.orchestrator);
        let blocked = tokio::spawn(async move {
            orchestrator
                .checkout(
                    CustomerId::new(),
                    "x",
                    &[CartLine::new("A", 1), CartLine::new("B", 1)],
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        blocked.abort();
        assert!(blocked.await.unwrap_err().is_cancelled());

        // A was released by the dropped transaction.
        let mut follower = tokio::time::timeout(Duration::from_secs(1), async {
            let mut tx = h.store.begin().await.unwrap();
            tx.lock_products(&[ProductId::new("A")]).await.unwrap();
            tx
        })
        .await
        .expect("lock on A was not released");
        follower.set_stock(&ProductId::new("A"), 10).await.unwrap();
        follower.rollback().await.unwrap();
        holder.rollback().await.unwrap();

        assert_eq!(h.store.order_count().await, 0);
        assert_eq!(h.stock("A").await, 10);
        assert_eq!(h.stock("B").await, 10);
    }
}
