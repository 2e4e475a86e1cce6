// Copyright (c) 2025 - Cowboy AI, Inc.
//! Broker connection lifecycle tests
//!
//! User Story: As the product service, I need a bounded, observable broker
//! connection so a misconfigured deployment fails fast instead of hanging.
//!
//! ```mermaid
//! stateDiagram-v2
//!     [*] --> Disconnected
//!     Disconnected --> Connecting: connect()
//!     Connecting --> Connecting: dial failed, attempts left
//!     Connecting --> Ready: dialed + exchange declared
//!     Connecting --> Failed: attempts exhausted / exchange mismatch
//! ```

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use inventory_events::broker::Transport;
use inventory_events::{
    BrokerConnection, BrokerError, ConnectionState, ExchangeConfig, InMemoryBroker, RetryPolicy,
};
use pretty_assertions::assert_eq;

use fixtures::{connection_for, immediate_retry};

/// Acceptance Criteria:
/// - A connect function failing N-1 times then succeeding reaches Ready
/// - Failing N times surfaces a fatal error and reaches Failed
#[tokio::test]
async fn test_connect_succeeds_on_last_attempt() {
    // Given a broker that refuses the first four dials
    let broker = InMemoryBroker::new();
    broker.refuse_connections(4);
    let connection = connection_for(&broker);

    // When connecting with five attempts
    connection.connect(&immediate_retry(5)).await.unwrap();

    // Then the connection is ready after exactly five dials
    assert_eq!(connection.state(), ConnectionState::Ready);
    assert_eq!(broker.connect_attempts(), 5);
    assert!(broker.has_exchange("events"));
}

#[tokio::test]
async fn test_connect_fails_after_exhausting_attempts() {
    // Given a broker that refuses five dials
    let broker = InMemoryBroker::new();
    broker.refuse_connections(5);
    let connection = connection_for(&broker);

    // When connecting with five attempts
    let err = connection.connect(&immediate_retry(5)).await.unwrap_err();

    // Then the error is fatal and the connection is failed
    assert!(matches!(err, BrokerError::RetriesExhausted { attempts: 5, .. }));
    assert_eq!(connection.state(), ConnectionState::Failed);
    assert_eq!(broker.connect_attempts(), 5);
    assert!(connection.await_ready().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_constant_delay_between_attempts() {
    // Given a broker that refuses two dials and a 5 s constant delay
    let broker = InMemoryBroker::new();
    broker.refuse_connections(2);
    let connection = connection_for(&broker);
    let started = tokio::time::Instant::now();

    // When connecting
    connection
        .connect(&RetryPolicy::fixed(3, Duration::from_secs(5)))
        .await
        .unwrap();

    // Then two delays elapsed on the paused clock
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test]
async fn test_exchange_mismatch_is_fatal_without_retry() {
    // Given an exchange already declared as non-durable
    let broker = InMemoryBroker::new();
    broker
        .declare_exchange(&ExchangeConfig::default().transient())
        .await
        .unwrap();
    let connection = connection_for(&broker);

    // When a durable declaration is attempted with retries available
    let err = connection.connect(&immediate_retry(5)).await.unwrap_err();

    // Then it fails on the first attempt
    assert!(matches!(err, BrokerError::ExchangeMismatch { .. }));
    assert_eq!(broker.connect_attempts(), 1);
    assert_eq!(connection.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_identical_redeclaration_is_idempotent() {
    // Given two connections sharing one broker
    let broker = InMemoryBroker::new();
    let first = connection_for(&broker);
    let second = connection_for(&broker);

    // When both declare the same exchange
    first.connect(&immediate_retry(1)).await.unwrap();
    second.connect(&immediate_retry(1)).await.unwrap();

    // Then both are ready
    assert_eq!(first.state(), ConnectionState::Ready);
    assert_eq!(second.state(), ConnectionState::Ready);
}

/// Acceptance Criteria:
/// - Many concurrent waiters are released by the single transition
#[tokio::test]
async fn test_concurrent_waiters_released_once() {
    // Given a broker that needs two dials and fifty waiting tasks
    let broker = InMemoryBroker::new();
    broker.refuse_connections(1);
    let connection = connection_for(&broker);

    let waiters: Vec<_> = (0..50)
        .map(|_| {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move { connection.await_ready().await.is_ok() })
        })
        .collect();

    // When the connection becomes ready
    connection.connect(&immediate_retry(2)).await.unwrap();

    // Then every waiter is released with success
    for waiter in waiters {
        assert!(waiter.await.unwrap());
    }
}

#[tokio::test]
async fn test_failed_connection_stays_failed() {
    // Given a connection that failed
    let broker = InMemoryBroker::new();
    broker.refuse_connections(1);
    let connection: Arc<BrokerConnection> = connection_for(&broker);
    assert!(connection.connect(&immediate_retry(1)).await.is_err());

    // When connecting again on the same instance
    let err = connection.connect(&immediate_retry(1)).await.unwrap_err();

    // Then the attempt is rejected; a new instance is required
    assert!(matches!(err, BrokerError::InvalidState(_)));
    assert_eq!(connection.state(), ConnectionState::Failed);

    let fresh = connection_for(&broker);
    fresh.connect(&immediate_retry(1)).await.unwrap();
    assert_eq!(fresh.state(), ConnectionState::Ready);
}
