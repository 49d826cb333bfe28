use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

pub type DbPool = Pool<AsyncPgConnection>;

/// Build the Diesel async connection pool shared by every task on this worker.
///
/// The pool is the only path to the message log; all workers in the cluster
/// point at the same database so sequence allocation stays global.
pub async fn connect(database_url: &str) -> DbPool {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(16)
        .build()
        .expect("failed to build connection pool");

    tracing::info!("message log pool created");

    pool
}
