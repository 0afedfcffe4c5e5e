use std::time::Duration;

use super::*;

#[tokio::test]
async fn cancel_wakes_every_token() {
    let canceller = Canceller::new();
    let mut a = canceller.token();
    let mut b = canceller.token();
    assert!(!a.is_cancelled());

    let waiter = tokio::spawn(async move {
        a.cancelled().await;
    });
    canceller.cancel();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    b.cancelled().await;
    assert!(canceller.is_cancelled());
}

#[tokio::test]
async fn tokens_taken_after_cancel_are_cancelled() {
    let canceller = Canceller::new();
    canceller.clone().cancel();
    let mut late = canceller.token();
    assert!(late.is_cancelled());
    late.cancelled().await;
}
