use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type StockId = i64;
pub type OrderId = i64;
pub type UserId = i64;
pub type TradeId = i64;
/// Price in integer minor-currency units (e.g. cents).
pub type Price = i64;
pub type Units = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(format!("unknown order side {:?}", other)),
        }
    }
}

/// Lifecycle of an order: `Placed -> PartiallyExecuted* -> FullyExecuted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Placed,
    #[serde(rename = "Partially Executed")]
    PartiallyExecuted,
    #[serde(rename = "Fully Executed")]
    FullyExecuted,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::PartiallyExecuted => "Partially Executed",
            OrderStatus::FullyExecuted => "Fully Executed",
        }
    }

    /// Whether an order in this status may sit in a book.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::PartiallyExecuted)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Placed" => Ok(OrderStatus::Placed),
            "Partially Executed" => Ok(OrderStatus::PartiallyExecuted),
            "Fully Executed" => Ok(OrderStatus::FullyExecuted),
            other => Err(format!("unknown order status {:?}", other)),
        }
    }
}

/// An order as submitted, before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub stock_id: StockId,
    pub user_id: UserId,
    pub side: OrderSide,
    pub units: Units,
    pub price: Price,
}

impl NewOrder {
    pub fn new(stock_id: StockId, user_id: UserId, side: OrderSide, units: Units, price: Price) -> Self {
        Self {
            stock_id,
            user_id,
            side,
            units,
            price,
        }
    }

    pub fn buy(stock_id: StockId, user_id: UserId, units: Units, price: Price) -> Self {
        Self::new(stock_id, user_id, OrderSide::Buy, units, price)
    }

    pub fn sell(stock_id: StockId, user_id: UserId, units: Units, price: Price) -> Self {
        Self::new(stock_id, user_id, OrderSide::Sell, units, price)
    }

    /// Returns the reason this order can't be accepted, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.units <= 0 {
            return Err(format!("units must be positive, got {}", self.units));
        }
        if self.price <= 0 {
            return Err(format!("price must be positive, got {}", self.price));
        }
        Ok(())
    }

    pub fn into_order(self, order_id: OrderId) -> Order {
        Order {
            order_id,
            stock_id: self.stock_id,
            user_id: self.user_id,
            units: self.units,
            price: self.price,
            side: self.side,
            status: OrderStatus::Placed,
            sequence: 0,
        }
    }
}

/// Parses a manual entry line: `<buy|sell> <stock_id> <units> <price> <user_id>`.
impl FromStr for NewOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!(
                "expected `<buy|sell> <stock_id> <units> <price> <user_id>`, got {} fields",
                fields.len()
            ));
        }
        let side = fields[0].parse::<OrderSide>()?;
        let number = |idx: usize, name: &str| {
            fields[idx]
                .parse::<i64>()
                .map_err(|e| format!("bad {} {:?}: {}", name, fields[idx], e))
        };
        Ok(NewOrder::new(
            number(1, "stock_id")?,
            number(4, "user_id")?,
            side,
            number(2, "units")?,
            number(3, "price")?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub stock_id: StockId,
    pub user_id: UserId,
    /// Remaining unfilled quantity.
    pub units: Units,
    pub price: Price,
    pub side: OrderSide,
    pub status: OrderStatus,
    /// Arrival position inside its book, assigned on first insertion.
    #[serde(skip)]
    pub sequence: u64,
}

impl Order {
    pub fn is_filled(&self) -> bool {
        self.units == 0
    }

    /// Applies a fill of `traded` units and moves the status accordingly.
    pub fn fill(&mut self, traded: Units) {
        debug_assert!(traded > 0 && traded <= self.units);
        debug_assert!(self.status.is_open());
        self.units -= traded;
        self.status = if self.is_filled() {
            OrderStatus::FullyExecuted
        } else {
            OrderStatus::PartiallyExecuted
        };
    }
}
