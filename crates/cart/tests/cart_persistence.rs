//! Integration tests for cart persistence and identity namespacing.

use std::sync::Arc;

use cart::{CartStore, NewCartLine};
use common::{Identity, Money, ProductId, Size, UserId};
use local_store::InMemoryLocalStore;

fn runner_x() -> NewCartLine {
    NewCartLine::new(
        ProductId::new(1),
        Size::new(42),
        "Runner X",
        "https://cdn.example/runner-x.jpg",
        Money::from_minor(500_000),
    )
}

fn court_y() -> NewCartLine {
    NewCartLine::new(
        ProductId::new(2),
        Size::new(40),
        "Court Y",
        "https://cdn.example/court-y.jpg",
        Money::from_minor(750_000),
    )
}

#[tokio::test]
async fn cart_survives_restart_for_the_same_identity() {
    let storage = Arc::new(InMemoryLocalStore::new());

    {
        let mut cart = CartStore::open(storage.clone(), Identity::Guest).await;
        cart.add_item(runner_x().with_quantity(2)).await;
    }

    // A fresh store over the same storage simulates an app restart.
    let cart = CartStore::open(storage, Identity::Guest).await;
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(
        cart.find(ProductId::new(1), Size::new(42)).unwrap().quantity,
        2
    );
}

#[tokio::test]
async fn identities_do_not_see_each_others_carts() {
    let storage = Arc::new(InMemoryLocalStore::new());
    let alice = Identity::User(UserId::new());
    let bob = Identity::User(UserId::new());

    let mut cart = CartStore::open(storage.clone(), alice).await;
    cart.add_item(runner_x().with_quantity(2)).await;

    // Bob signs in on the same device: his cart starts empty.
    cart.switch_identity(bob).await;
    assert!(cart.is_empty());

    cart.add_item(court_y()).await;
    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.find(ProductId::new(2), Size::new(40)).unwrap().quantity, 1);

    // Alice signs back in: her cart reappears unchanged.
    cart.switch_identity(alice).await;
    assert_eq!(cart.lines().len(), 1);
    let line = cart.find(ProductId::new(1), Size::new(42)).unwrap();
    assert_eq!(line.quantity, 2);
    assert_eq!(line.title, "Runner X");
}

#[tokio::test]
async fn sign_out_falls_back_to_the_guest_namespace() {
    let storage = Arc::new(InMemoryLocalStore::new());
    let user = Identity::User(UserId::new());

    let mut cart = CartStore::open(storage.clone(), Identity::Guest).await;
    cart.add_item(runner_x()).await;

    cart.switch_identity(user).await;
    assert!(cart.is_empty());

    cart.switch_identity(Identity::Guest).await;
    assert_eq!(cart.lines().len(), 1);
}

#[tokio::test]
async fn reset_only_clears_the_active_namespace() {
    let storage = Arc::new(InMemoryLocalStore::new());
    let alice = Identity::User(UserId::new());

    let mut cart = CartStore::open(storage.clone(), alice).await;
    cart.add_item(runner_x()).await;

    cart.switch_identity(Identity::Guest).await;
    cart.add_item(court_y()).await;
    cart.reset().await;
    assert!(cart.is_empty());

    cart.switch_identity(alice).await;
    assert_eq!(cart.lines().len(), 1);
}
