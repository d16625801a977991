//! SQLite adapter for the persistence port, backed by a sqlx connection pool.

use crate::engine::entry::{NewOrder, Order, OrderId, OrderStatus, Price, StockId, Trade, TradeId, Units};
use crate::engine::matchlogic::Settlement;
use crate::error::StoreError;
use crate::store::OrderStore;
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;

const CREATE_ORDERS: &str = "CREATE TABLE IF NOT EXISTS order_records (
    order_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_id   INTEGER NOT NULL,
    user_id    INTEGER NOT NULL,
    units      INTEGER NOT NULL,
    price      INTEGER NOT NULL,
    status     TEXT    NOT NULL,
    order_type TEXT    NOT NULL
)";

const CREATE_TRANSACTIONS: &str = "CREATE TABLE IF NOT EXISTS transactions (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    buy_order_id     INTEGER NOT NULL REFERENCES order_records(order_id),
    sell_order_id    INTEGER NOT NULL REFERENCES order_records(order_id),
    stock_id         INTEGER NOT NULL,
    units            INTEGER NOT NULL,
    buy_order_price  INTEGER NOT NULL,
    sell_order_price INTEGER NOT NULL
)";

const CREATE_TRADE_PAIR_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS transactions_pair \
    ON transactions (buy_order_id, sell_order_id)";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_ORDERS).execute(&pool).await?;
        sqlx::query(CREATE_TRANSACTIONS).execute(&pool).await?;
        sqlx::query(CREATE_TRADE_PAIR_INDEX).execute(&pool).await?;
        log::info!("order store ready");
        Ok(Self { pool })
    }

    async fn write_status(
        conn: &mut SqliteConnection,
        order_id: OrderId,
        status: OrderStatus,
        units: Units,
    ) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE order_records SET status = ?, units = ? WHERE order_id = ?")
            .bind(status.as_str())
            .bind(units)
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(order_id));
        }
        Ok(())
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order, StoreError> {
    let status: String = row.try_get("status")?;
    let side: String = row.try_get("order_type")?;
    Ok(Order {
        order_id: row.try_get("order_id")?,
        stock_id: row.try_get("stock_id")?,
        user_id: row.try_get("user_id")?,
        units: row.try_get("units")?,
        price: row.try_get("price")?,
        side: side.parse().map_err(StoreError::Corrupt)?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        sequence: 0,
    })
}

fn trade_from_row(row: &SqliteRow) -> Result<Trade, StoreError> {
    Ok(Trade {
        id: row.try_get("id")?,
        buy_order_id: row.try_get("buy_order_id")?,
        sell_order_id: row.try_get("sell_order_id")?,
        stock_id: row.try_get("stock_id")?,
        units: row.try_get("units")?,
        buy_price: row.try_get("buy_order_price")?,
        sell_price: row.try_get("sell_order_price")?,
    })
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, StoreError> {
        let done = sqlx::query(
            "INSERT INTO order_records (stock_id, user_id, units, price, status, order_type) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order.stock_id)
        .bind(order.user_id)
        .bind(order.units)
        .bind(order.price)
        .bind(OrderStatus::Placed.as_str())
        .bind(order.side.as_str())
        .execute(&self.pool)
        .await?;
        Ok(done.last_insert_rowid())
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        units: Units,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::write_status(&mut conn, order_id, status, units).await
    }

    async fn record_trade(&self, settlement: &Settlement) -> Result<TradeId, StoreError> {
        let mut tx = self.pool.begin().await?;
        let recorded: Option<TradeId> = sqlx::query_scalar(
            "SELECT id FROM transactions WHERE buy_order_id = ? AND sell_order_id = ?",
        )
        .bind(settlement.buy_order_id())
        .bind(settlement.sell_order_id())
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(trade_id) = recorded {
            log::warn!(
                "trade {} for buy #{} / sell #{} already recorded",
                trade_id,
                settlement.buy_order_id(),
                settlement.sell_order_id()
            );
            return Ok(trade_id);
        }
        for leg in [&settlement.buy, &settlement.sell] {
            Self::write_status(&mut tx, leg.order_id, leg.status, leg.units).await?;
        }
        let done = sqlx::query(
            "INSERT INTO transactions \
             (buy_order_id, sell_order_id, stock_id, units, buy_order_price, sell_order_price) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(settlement.buy_order_id())
        .bind(settlement.sell_order_id())
        .bind(settlement.stock_id())
        .bind(settlement.traded)
        .bind(settlement.buy.price)
        .bind(settlement.sell.price)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(done.last_insert_rowid())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT order_id, stock_id, user_id, units, price, status, order_type \
             FROM order_records ORDER BY order_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn list_trades(&self, after: TradeId) -> Result<Vec<Trade>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, buy_order_id, sell_order_id, stock_id, units, buy_order_price, sell_order_price \
             FROM transactions WHERE id > ? ORDER BY id",
        )
        .bind(after)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(trade_from_row).collect()
    }

    async fn latest_prices(&self) -> Result<Vec<(StockId, Price)>, StoreError> {
        let rows = sqlx::query(
            "SELECT t.stock_id, t.sell_order_price FROM transactions t \
             WHERE t.id = (SELECT MAX(id) FROM transactions WHERE stock_id = t.stock_id) \
             ORDER BY t.sell_order_price DESC, t.stock_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<(StockId, Price), StoreError> {
                Ok((row.try_get(0)?, row.try_get(1)?))
            })
            .collect()
    }
}
