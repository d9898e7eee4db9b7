//! End-to-end reconciliation against a real migrated SQLite database.

use rust_decimal::Decimal;

use jardin_db::migrations::run_pending;
use jardin_db::repositories::{SqlClientRepository, SqlPriceBookRepository, SqlReconciliationStore};
use jardin_db::{connect_with_settings, DbPool};
use jardin_engine::Reconciler;

async fn migrated_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    run_pending(&pool).await.expect("run migrations");
    pool
}

#[tokio::test]
async fn a_full_turn_lands_in_sqlite() {
    let pool = migrated_pool().await;
    let engine = Reconciler::new(SqlReconciliationStore::new(pool.clone()), 30);

    let text = "\
Listo, registré todo.

[CLIENTE NUEVO]
Nombre: Maria Garcia
Teléfono: 831-555-9876
Idioma: español
[FIN CLIENTE]

[PROPUESTA]
Cliente: Maria Garcia
Servicios:
- Podar árboles: $150
- Limpieza de jardín: $80
[FIN PROPUESTA]

[MENSAJE PARA CLIENTE: Maria Garcia]
Hola Maria! Su propuesta está lista: $230 en total.
[FIN MENSAJE]";

    let turn = engine.reconcile(text).await.expect("reconcile");
    assert_eq!(turn.manifest.new_clients.len(), 1);
    assert_eq!(turn.manifest.new_proposals.len(), 1);
    assert_eq!(turn.manifest.new_client_messages.len(), 1);
    assert_eq!(turn.manifest.new_proposals[0].total, Decimal::new(230, 0));

    let clients = SqlClientRepository::new(pool.clone()).list_all().await.expect("list clients");
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "Maria Garcia");
    assert_eq!(clients[0].phone.as_deref(), Some("831-555-9876"));

    let prices = SqlPriceBookRepository::new(pool).list_all().await.expect("list prices");
    assert_eq!(prices.len(), 2);
}

#[tokio::test]
async fn price_learning_survives_round_trips_through_sqlite() {
    let pool = migrated_pool().await;
    let engine = Reconciler::new(SqlReconciliationStore::new(pool.clone()), 30);

    engine
        .reconcile(
            "[CLIENTE NUEVO]\nNombre: Ana Ruiz\n[FIN CLIENTE]\n\
             [SERVICIO REGISTRADO]\nCliente: Ana Ruiz\nServicio: Weeding\nPrecio: $40\n[FIN SERVICIO]",
        )
        .await
        .expect("first turn");
    engine
        .reconcile(
            "[SERVICIO REGISTRADO]\nCliente: Ana Ruiz\nServicio: weeding\nPrecio: $55.50\n[FIN SERVICIO]",
        )
        .await
        .expect("second turn");

    let prices = SqlPriceBookRepository::new(pool).list_all().await.expect("list prices");
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].default_price, Decimal::new(5550, 2));
    assert_eq!(prices[0].times_used, 2);
}

#[tokio::test]
async fn unknown_client_skips_the_block_but_commits_the_turn() {
    let pool = migrated_pool().await;
    let engine = Reconciler::new(SqlReconciliationStore::new(pool.clone()), 30);

    let text = "\
[CLIENTE NUEVO]
Nombre: Ana Ruiz
[FIN CLIENTE]

[MENSAJE PARA CLIENTE: Pedro]
Hola Pedro!
[FIN MENSAJE]";

    let turn = engine.reconcile(text).await.expect("reconcile");
    assert_eq!(turn.manifest.new_clients.len(), 1);
    assert_eq!(turn.manifest.skipped.len(), 1);

    let clients = SqlClientRepository::new(pool).list_all().await.expect("list clients");
    assert_eq!(clients.len(), 1);
}
