//! End-to-end tests through the public `Exchange` API.
//!
//! Registry, custody, ledger, books and matching together: the reference
//! scenarios, escrow accounting, market-order edge cases, token deletion,
//! withdraw rollback, and a randomized conservation sweep.

use clobex_engine::{Exchange, OrderStatus, SharedExchange};
use clobex_ledger::{Custody, InMemoryCustody};
use clobex_types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn usdt() -> Ticker {
    Ticker::new("USDT")
}

fn uni() -> Ticker {
    Ticker::new("UNI")
}

/// Exchange with USDT (quote) and UNI registered.
struct Harness {
    ex: Exchange<InMemoryCustody>,
    admin: TraderId,
}

impl Harness {
    fn new() -> Self {
        let admin = TraderId::new();
        let config = ExchangeConfig::new(admin, TraderId::new());
        let mut ex = Exchange::new(config, InMemoryCustody::new()).expect("valid config");
        ex.add_token(admin, usdt(), AssetRef::from_bytes([1; 20])).unwrap();
        ex.add_token(admin, uni(), AssetRef::from_bytes([2; 20])).unwrap();
        Self { ex, admin }
    }

    fn asset(&self, ticker: &Ticker) -> AssetRef {
        self.ex.describe(ticker).expect("registered").asset_ref
    }

    /// New trader with `amount` of `ticker` minted externally and deposited.
    fn trader_with(&mut self, ticker: &Ticker, amount: i64) -> TraderId {
        let trader = TraderId::new();
        self.fund(trader, ticker, amount);
        trader
    }

    fn fund(&mut self, trader: TraderId, ticker: &Ticker, amount: i64) {
        let asset = self.asset(ticker);
        self.ex.custody_mut().mint(asset, trader, dec(amount));
        self.ex.deposit(trader, ticker, dec(amount)).unwrap();
    }

    fn assert_consistent(&self) {
        self.ex.check_book_invariants().unwrap();
        self.ex.verify_supply(&usdt()).unwrap();
        self.ex.verify_supply(&uni()).unwrap();
    }
}

// =====================================================================
// Reference scenarios
// =====================================================================

#[test]
fn market_buy_takes_whole_ask() {
    let mut h = Harness::new();
    let x = h.trader_with(&uni(), 100);
    let y = h.trader_with(&usdt(), 1000);

    let ask = h.ex.limit_order(x, &uni(), OrderSide::Sell, dec(10), dec(40)).unwrap();
    assert_eq!(ask.status, OrderStatus::Resting);

    let outcome = h.ex.market_order(y, &uni(), OrderSide::Buy, dec(40)).unwrap();
    assert_eq!(outcome.status, OrderStatus::Filled);
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].price, dec(10));
    assert_eq!(outcome.trades[0].buyer, y);
    assert_eq!(outcome.trades[0].seller, x);
    assert_eq!(outcome.quote_volume(), dec(400));

    assert!(h.ex.get_orders(&uni(), OrderSide::Sell).is_empty());
    assert_eq!(h.ex.get_balance(x, &usdt()), dec(400));
    assert_eq!(h.ex.get_balance(x, &uni()), dec(60));
    assert_eq!(h.ex.get_balance(y, &uni()), dec(40));
    assert_eq!(h.ex.get_balance(y, &usdt()), dec(600));
    h.assert_consistent();
}

#[test]
fn partial_fill_leaves_maker_resting() {
    let mut h = Harness::new();
    let x = h.trader_with(&uni(), 100);
    let y = h.trader_with(&usdt(), 1000);

    h.ex.limit_order(x, &uni(), OrderSide::Sell, dec(10), dec(40)).unwrap();
    let outcome = h.ex.market_order(y, &uni(), OrderSide::Buy, dec(25)).unwrap();
    assert_eq!(outcome.status, OrderStatus::Filled);
    assert_eq!(outcome.filled_quantity(), dec(25));

    let asks = h.ex.get_orders(&uni(), OrderSide::Sell);
    assert_eq!(asks.len(), 1);
    assert_eq!(asks[0].trader, x);
    assert_eq!(asks[0].filled, dec(25));
    assert_eq!(asks[0].remaining(), dec(15));

    // 15 UNI still escrowed behind the ask.
    let bal = h.ex.balance(x, &uni());
    assert_eq!(bal.frozen, dec(15));
    assert_eq!(bal.available, dec(60));
    h.assert_consistent();
}

#[test]
fn duplicate_token_leaves_registry_unchanged() {
    let mut h = Harness::new();
    let before = h.ex.tokens();

    let err = h
        .ex
        .add_token(h.admin, uni(), AssetRef::from_bytes([9; 20]))
        .unwrap_err();
    assert!(matches!(err, ClobError::InvalidTicker { .. }));
    assert_eq!(h.ex.tokens(), before);
    assert_eq!(h.ex.list_tickers(), &[usdt(), uni()]);
}

#[test]
fn overdrawn_withdraw_keeps_balance() {
    let mut h = Harness::new();
    let t = h.trader_with(&uni(), 40);

    let err = h.ex.withdraw(t, &uni(), dec(50)).unwrap_err();
    assert_eq!(
        err,
        ClobError::InsufficientBalance {
            ticker: uni(),
            needed: dec(50),
            available: dec(40),
        }
    );
    assert_eq!(h.ex.get_balance(t, &uni()), dec(40));
    h.assert_consistent();
}

// =====================================================================
// Priority and crossing
// =====================================================================

#[test]
fn price_then_time_priority() {
    let mut h = Harness::new();
    let early = h.trader_with(&uni(), 10);
    let late = h.trader_with(&uni(), 10);
    let cheap = h.trader_with(&uni(), 10);
    let buyer = h.trader_with(&usdt(), 1000);

    h.ex.limit_order(early, &uni(), OrderSide::Sell, dec(11), dec(10)).unwrap();
    h.ex.limit_order(late, &uni(), OrderSide::Sell, dec(11), dec(10)).unwrap();
    h.ex.limit_order(cheap, &uni(), OrderSide::Sell, dec(10), dec(10)).unwrap();

    let asks = h.ex.get_orders(&uni(), OrderSide::Sell);
    let owners: Vec<TraderId> = asks.iter().map(|o| o.trader).collect();
    assert_eq!(owners, vec![cheap, early, late]);

    let outcome = h.ex.market_order(buyer, &uni(), OrderSide::Buy, dec(15)).unwrap();
    let sellers: Vec<TraderId> = outcome.trades.iter().map(|t| t.seller).collect();
    assert_eq!(sellers, vec![cheap, early]);
    assert_eq!(outcome.trades[1].price, dec(11));
    assert_eq!(outcome.trades[1].quantity, dec(5));

    assert_eq!(h.ex.best_ask(&uni()).unwrap().trader, early);
    assert_eq!(h.ex.depth(&uni(), OrderSide::Sell, 5), vec![(dec(11), dec(15))]);
    h.assert_consistent();
}

#[test]
fn limit_sell_sweeps_bids_down_to_its_limit() {
    let mut h = Harness::new();
    let b1 = h.trader_with(&usdt(), 1000);
    let b2 = h.trader_with(&usdt(), 1000);
    let b3 = h.trader_with(&usdt(), 1000);
    let seller = h.trader_with(&uni(), 100);

    h.ex.limit_order(b1, &uni(), OrderSide::Buy, dec(12), dec(5)).unwrap();
    h.ex.limit_order(b2, &uni(), OrderSide::Buy, dec(11), dec(5)).unwrap();
    h.ex.limit_order(b3, &uni(), OrderSide::Buy, dec(9), dec(5)).unwrap();

    let outcome = h.ex.limit_order(seller, &uni(), OrderSide::Sell, dec(10), dec(20)).unwrap();
    assert_eq!(outcome.trades.len(), 2);
    assert_eq!(outcome.status, OrderStatus::Resting);
    assert_eq!(outcome.filled_quantity(), dec(10));

    // Remainder rests at 10 above the untouched bid at 9.
    assert_eq!(h.ex.best_ask(&uni()).unwrap().remaining(), dec(10));
    assert_eq!(h.ex.best_bid(&uni()).unwrap().trader, b3);
    assert_eq!(h.ex.get_balance(seller, &usdt()), dec(115));
    assert_eq!(h.ex.balance(seller, &uni()).frozen, dec(10));
    // Maker escrow fully consumed, nothing left frozen.
    assert_eq!(h.ex.balance(b1, &usdt()).frozen, Decimal::ZERO);
    assert_eq!(h.ex.get_balance(b1, &uni()), dec(5));
    h.assert_consistent();
}

#[test]
fn self_trade_settles_against_own_order() {
    let mut h = Harness::new();
    let t = h.trader_with(&uni(), 10);
    h.fund(t, &usdt(), 100);

    h.ex.limit_order(t, &uni(), OrderSide::Sell, dec(10), dec(10)).unwrap();
    let outcome = h.ex.limit_order(t, &uni(), OrderSide::Buy, dec(10), dec(10)).unwrap();
    assert_eq!(outcome.status, OrderStatus::Filled);
    assert_eq!(outcome.trades[0].buyer, outcome.trades[0].seller);

    assert_eq!(h.ex.balance(t, &uni()), BalanceEntry { available: dec(10), frozen: Decimal::ZERO });
    assert_eq!(h.ex.get_balance(t, &usdt()), dec(100));
    assert!(h.ex.order_book(&uni()).unwrap().is_empty());
    h.assert_consistent();
}

// =====================================================================
// Market orders
// =====================================================================

#[test]
fn market_buy_stops_when_quote_runs_out() {
    let mut h = Harness::new();
    let s1 = h.trader_with(&uni(), 10);
    let s2 = h.trader_with(&uni(), 10);
    let buyer = h.trader_with(&usdt(), 150);

    h.ex.limit_order(s1, &uni(), OrderSide::Sell, dec(10), dec(10)).unwrap();
    h.ex.limit_order(s2, &uni(), OrderSide::Sell, dec(20), dec(10)).unwrap();

    let outcome = h.ex.market_order(buyer, &uni(), OrderSide::Buy, dec(20)).unwrap();
    assert_eq!(outcome.status, OrderStatus::PartiallyFilled);
    assert_eq!(outcome.filled_quantity(), Decimal::new(125, 1));
    assert_eq!(outcome.trades[1].quantity, Decimal::new(25, 1));
    assert_eq!(h.ex.get_balance(buyer, &usdt()), Decimal::ZERO);
    assert_eq!(h.ex.get_balance(buyer, &uni()), Decimal::new(125, 1));

    // Market orders never rest.
    assert!(h.ex.get_orders(&uni(), OrderSide::Buy).is_empty());
    assert_eq!(h.ex.best_ask(&uni()).unwrap().remaining(), Decimal::new(75, 1));
    h.assert_consistent();
}

#[test]
fn market_order_on_empty_book_expires() {
    let mut h = Harness::new();
    let buyer = h.trader_with(&usdt(), 100);

    let outcome = h.ex.market_order(buyer, &uni(), OrderSide::Buy, dec(5)).unwrap();
    assert_eq!(outcome.status, OrderStatus::Expired);
    assert!(outcome.trades.is_empty());
    assert_eq!(h.ex.get_balance(buyer, &usdt()), dec(100));
}

#[test]
fn market_buy_without_quote_expires() {
    let mut h = Harness::new();
    let seller = h.trader_with(&uni(), 10);
    let broke = TraderId::new();
    h.ex.limit_order(seller, &uni(), OrderSide::Sell, dec(10), dec(10)).unwrap();

    let outcome = h.ex.market_order(broke, &uni(), OrderSide::Buy, dec(5)).unwrap();
    assert_eq!(outcome.status, OrderStatus::Expired);
    assert_eq!(h.ex.best_ask(&uni()).unwrap().filled, Decimal::ZERO);
}

#[test]
fn market_sell_needs_base_up_front() {
    let mut h = Harness::new();
    let buyer = h.trader_with(&usdt(), 1000);
    let seller = h.trader_with(&uni(), 5);
    h.ex.limit_order(buyer, &uni(), OrderSide::Buy, dec(10), dec(50)).unwrap();

    let err = h.ex.market_order(seller, &uni(), OrderSide::Sell, dec(6)).unwrap_err();
    assert!(matches!(err, ClobError::InsufficientBalance { .. }));
    assert_eq!(h.ex.best_bid(&uni()).unwrap().filled, Decimal::ZERO);

    let outcome = h.ex.market_order(seller, &uni(), OrderSide::Sell, dec(5)).unwrap();
    assert_eq!(outcome.status, OrderStatus::Filled);
    assert_eq!(h.ex.get_balance(seller, &usdt()), dec(50));
    assert_eq!(h.ex.balance(buyer, &usdt()).frozen, dec(450));
    h.assert_consistent();
}

// =====================================================================
// Precision
// =====================================================================

#[test]
fn tiny_price_bid_releases_all_escrow_when_filled() {
    let mut h = Harness::new();
    let buyer = h.trader_with(&usdt(), 1);
    let price = Decimal::new(7, 8);
    let quarter = Decimal::new(25, 2);

    let bid = h.ex.limit_order(buyer, &uni(), OrderSide::Buy, price, Decimal::new(75, 2)).unwrap();
    assert_eq!(bid.status, OrderStatus::Resting);
    assert_eq!(h.ex.balance(buyer, &usdt()).frozen, Decimal::new(525, 10));

    for _ in 0..3 {
        let seller = h.trader_with(&uni(), 1);
        h.ex.limit_order(seller, &uni(), OrderSide::Sell, price, quarter).unwrap();
        assert_eq!(h.ex.get_balance(seller, &usdt()), Decimal::new(175, 10));
    }

    assert!(h.ex.best_bid(&uni()).is_none());
    let bal = h.ex.balance(buyer, &usdt());
    assert_eq!(bal.frozen, Decimal::ZERO);
    assert_eq!(bal.available, dec(1) - Decimal::new(525, 10));
    assert_eq!(h.ex.get_balance(buyer, &uni()), Decimal::new(75, 2));
    h.assert_consistent();
}

#[test]
fn eight_place_price_fills_in_pieces_without_dust() {
    let mut h = Harness::new();
    let buyer = h.trader_with(&usdt(), 100);
    let price = Decimal::new(792_281_625, 8);
    let half = Decimal::new(5, 1);

    h.ex.limit_order(buyer, &uni(), OrderSide::Buy, price, Decimal::new(15, 1)).unwrap();
    for _ in 0..3 {
        let seller = h.trader_with(&uni(), 1);
        h.ex.market_order(seller, &uni(), OrderSide::Sell, half).unwrap();
    }

    assert!(h.ex.get_orders(&uni(), OrderSide::Buy).is_empty());
    let bal = h.ex.balance(buyer, &usdt());
    assert_eq!(bal.frozen, Decimal::ZERO);
    assert_eq!(bal.available, dec(100) - Decimal::new(11_884_224_375, 9));
    h.assert_consistent();
}

#[test]
fn over_precise_orders_are_rejected_and_journaled() {
    let mut h = Harness::new();
    let trader = h.trader_with(&usdt(), 1000);
    h.ex.drain_events();

    let max_places = Decimal::from_str_exact("7.9228162514264337593543950335").unwrap();
    assert_eq!(
        h.ex.limit_order(trader, &uni(), OrderSide::Buy, max_places, dec(1)).unwrap_err(),
        ClobError::InvalidPrice(max_places)
    );
    let tiny = Decimal::from_str_exact("0.0000000000000000000000000007").unwrap();
    assert_eq!(
        h.ex.limit_order(trader, &uni(), OrderSide::Buy, tiny, Decimal::new(75, 2)).unwrap_err(),
        ClobError::InvalidPrice(tiny)
    );
    let amount = dec(1_000_000_000);
    assert_eq!(
        h.ex.limit_order(trader, &uni(), OrderSide::Buy, dec(1_000_000_000_000), amount)
            .unwrap_err(),
        ClobError::InvalidAmount(amount)
    );

    assert_eq!(h.ex.events().len(), 3);
    assert!(h.ex.events().iter().all(|e| matches!(e, ExchangeEvent::OrderRejected { .. })));
    assert!(h.ex.order_book(&uni()).unwrap().is_empty());
    assert_eq!(h.ex.balance(trader, &usdt()).available, dec(1000));
}

// =====================================================================
// Deposit / withdraw
// =====================================================================

#[test]
fn deposit_needs_external_funds() {
    let mut h = Harness::new();
    let t = TraderId::new();
    let asset = h.asset(&uni());
    h.ex.custody_mut().mint(asset, t, dec(10));

    let err = h.ex.deposit(t, &uni(), dec(20)).unwrap_err();
    assert!(matches!(
        err,
        ClobError::InsufficientExternalBalance { available, .. } if available == dec(10)
    ));
    assert_eq!(h.ex.get_balance(t, &uni()), Decimal::ZERO);

    assert!(matches!(
        h.ex.deposit(t, &Ticker::new("DAI"), dec(1)),
        Err(ClobError::InvalidTicker { .. })
    ));
    assert!(matches!(h.ex.deposit(t, &uni(), Decimal::ZERO), Err(ClobError::InvalidAmount(_))));
    assert!(matches!(
        h.ex.deposit(TraderId::NIL, &uni(), dec(1)),
        Err(ClobError::InvalidAddress { .. })
    ));
}

#[test]
fn failed_withdraw_transfer_rolls_back() {
    let mut h = Harness::new();
    let t = h.trader_with(&uni(), 40);
    let asset = h.asset(&uni());

    h.ex.custody_mut().set_fail_transfers(true);
    let err = h.ex.withdraw(t, &uni(), dec(30)).unwrap_err();
    assert!(matches!(err, ClobError::InsufficientExternalBalance { .. }));
    assert_eq!(h.ex.get_balance(t, &uni()), dec(40));
    h.assert_consistent();

    h.ex.custody_mut().set_fail_transfers(false);
    h.ex.withdraw(t, &uni(), dec(30)).unwrap();
    assert_eq!(h.ex.get_balance(t, &uni()), dec(10));
    assert_eq!(h.ex.custody().balance_of(&asset, &t), dec(30));
    h.assert_consistent();
}

#[test]
fn frozen_funds_cannot_be_withdrawn() {
    let mut h = Harness::new();
    let t = h.trader_with(&uni(), 40);
    h.ex.limit_order(t, &uni(), OrderSide::Sell, dec(10), dec(30)).unwrap();

    assert!(matches!(
        h.ex.withdraw(t, &uni(), dec(11)),
        Err(ClobError::InsufficientBalance { .. })
    ));
    h.ex.withdraw(t, &uni(), dec(10)).unwrap();
    assert_eq!(h.ex.get_balance(t, &uni()), dec(30));
}

// =====================================================================
// Token deletion
// =====================================================================

#[test]
fn delete_token_drains_book_and_releases_escrow() {
    let mut h = Harness::new();
    let seller = h.trader_with(&uni(), 100);
    let buyer = h.trader_with(&usdt(), 100);
    h.ex.limit_order(seller, &uni(), OrderSide::Sell, dec(10), dec(40)).unwrap();
    h.ex.limit_order(buyer, &uni(), OrderSide::Buy, dec(9), dec(5)).unwrap();
    assert_eq!(h.ex.balance(buyer, &usdt()).frozen, dec(45));

    let removed = h.ex.delete_token(h.admin, &uni()).unwrap();
    assert_eq!(removed.ticker, uni());
    assert_eq!(h.ex.list_tickers(), &[usdt()]);
    assert!(h.ex.order_book(&uni()).is_none());
    assert!(h.ex.get_orders(&uni(), OrderSide::Sell).is_empty());

    let untouched = BalanceEntry {
        available: dec(100),
        frozen: Decimal::ZERO,
    };
    assert_eq!(h.ex.balance(seller, &uni()), untouched);
    assert_eq!(h.ex.balance(buyer, &usdt()), untouched);
    assert!(matches!(
        h.ex.events().last(),
        Some(ExchangeEvent::TokenRemoved { drained_orders: 2, .. })
    ));

    // No longer tradable or withdrawable.
    assert!(matches!(
        h.ex.limit_order(seller, &uni(), OrderSide::Sell, dec(10), dec(1)),
        Err(ClobError::InvalidTicker { .. })
    ));
    assert!(matches!(h.ex.withdraw(seller, &uni(), dec(1)), Err(ClobError::InvalidTicker { .. })));
}

#[test]
fn non_admin_cannot_touch_registry() {
    let mut h = Harness::new();
    let intruder = TraderId::new();
    assert!(matches!(
        h.ex.add_token(intruder, Ticker::new("DAI"), AssetRef::from_bytes([3; 20])),
        Err(ClobError::AccessDenied { .. })
    ));
    assert!(matches!(h.ex.delete_token(intruder, &uni()), Err(ClobError::AccessDenied { .. })));
    assert_eq!(h.ex.list_tickers().len(), 2);
}

// =====================================================================
// Events and journal
// =====================================================================

#[test]
fn journal_records_every_state_change() {
    let mut h = Harness::new();
    let x = h.trader_with(&uni(), 100);
    let y = h.trader_with(&usdt(), 1000);
    h.ex.limit_order(x, &uni(), OrderSide::Sell, dec(10), dec(40)).unwrap();
    h.ex.market_order(y, &uni(), OrderSide::Buy, dec(25)).unwrap();
    let _ = h.ex.withdraw(y, &uni(), dec(100));
    let _ = h.ex.limit_order(y, &uni(), OrderSide::Sell, dec(10), dec(100));

    let names: Vec<&str> = h.ex.events().iter().map(ExchangeEvent::name).collect();
    assert_eq!(
        names,
        vec![
            "token_added",
            "token_added",
            "deposited",
            "deposited",
            "order_rested",
            "trade_executed",
            "order_rejected",
        ]
    );

    let json = serde_json::to_string(h.ex.events()).unwrap();
    assert!(json.contains("\"event\":\"trade_executed\""));

    let drained = h.ex.drain_events();
    assert_eq!(drained.len(), 7);
    assert!(h.ex.events().is_empty());
}

#[test]
fn trade_ids_follow_fill_sequence() {
    let mut h = Harness::new();
    let x = h.trader_with(&uni(), 100);
    let y = h.trader_with(&usdt(), 10_000);
    h.ex.limit_order(x, &uni(), OrderSide::Sell, dec(10), dec(30)).unwrap();
    h.ex.limit_order(x, &uni(), OrderSide::Sell, dec(12), dec(30)).unwrap();

    let mut trades = h.ex.market_order(y, &uni(), OrderSide::Buy, dec(45)).unwrap().trades;
    trades.extend(h.ex.limit_order(y, &uni(), OrderSide::Buy, dec(12), dec(10)).unwrap().trades);
    let sequences: Vec<u64> = trades.iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2]);
    assert_eq!(trades[0].id, TradeId::deterministic(0));

    let journaled: Vec<TradeId> = h
        .ex
        .events()
        .iter()
        .filter_map(|e| match e {
            ExchangeEvent::TradeExecuted(t) => Some(t.id),
            _ => None,
        })
        .collect();
    let expected: Vec<TradeId> = (0..3).map(TradeId::deterministic).collect();
    assert_eq!(journaled, expected);
}

#[test]
fn config_from_json_drives_quote_ticker() {
    let admin = TraderId::new();
    let json = format!(
        r#"{{"admin":"{}","exchange_account":"{}","quote_ticker":"DAI"}}"#,
        admin.0,
        TraderId::new().0
    );
    let config = ExchangeConfig::from_json(&json).unwrap();
    let mut ex = Exchange::new(config, InMemoryCustody::new()).unwrap();
    ex.add_token(admin, Ticker::new("DAI"), AssetRef::from_bytes([1; 20])).unwrap();
    ex.add_token(admin, uni(), AssetRef::from_bytes([2; 20])).unwrap();

    let t = TraderId::new();
    ex.custody_mut().mint(AssetRef::from_bytes([1; 20]), t, dec(100));
    ex.deposit(t, &Ticker::new("DAI"), dec(100)).unwrap();
    let outcome = ex.limit_order(t, &uni(), OrderSide::Buy, dec(10), dec(10)).unwrap();
    assert_eq!(outcome.status, OrderStatus::Resting);
    assert_eq!(ex.balance(t, &Ticker::new("DAI")).frozen, dec(100));
}

#[test]
fn shared_handle_runs_operations_under_lock() {
    let h = Harness::new();
    let admin = h.admin;
    let shared = SharedExchange::new(h.ex);
    let other = shared.clone();

    other
        .with_mut(|ex| ex.add_token(admin, Ticker::new("LINK"), AssetRef::from_bytes([5; 20])))
        .unwrap()
        .unwrap();
    let tickers = shared.with(|ex| ex.list_tickers().to_vec()).unwrap();
    assert_eq!(tickers, vec![usdt(), uni(), Ticker::new("LINK")]);
}

// =====================================================================
// Randomized sweep
// =====================================================================

/// Sum of the escrow every resting order of `trader` should hold.
fn expected_frozen(ex: &Exchange<InMemoryCustody>, trader: TraderId) -> (Decimal, Decimal) {
    let mut quote = Decimal::ZERO;
    let mut base = Decimal::ZERO;
    for order in ex.get_orders(&uni(), OrderSide::Buy) {
        if order.trader == trader {
            quote += order.price.unwrap_or_default() * order.remaining();
        }
    }
    for order in ex.get_orders(&uni(), OrderSide::Sell) {
        if order.trader == trader {
            base += order.remaining();
        }
    }
    (quote, base)
}

#[test]
fn random_flow_conserves_supply_and_escrow() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut h = Harness::new();
    let traders: Vec<TraderId> = (0..6).map(|_| TraderId::new()).collect();
    for &t in &traders {
        h.fund(t, &usdt(), 10_000);
        h.fund(t, &uni(), 500);
    }

    for step in 0..400 {
        let t = traders[rng.gen_range(0..traders.len())];
        let side = if rng.gen_bool(0.5) { OrderSide::Buy } else { OrderSide::Sell };
        let amount = dec(rng.gen_range(1..40));
        let result = match rng.gen_range(0..10) {
            0..=6 => {
                let price = dec(rng.gen_range(90..110)) / dec(10);
                h.ex.limit_order(t, &uni(), side, price, amount)
            }
            7 | 8 => h.ex.market_order(t, &uni(), side, amount),
            _ => {
                let _ = h.ex.withdraw(t, &uni(), dec(rng.gen_range(1..20)));
                continue;
            }
        };
        if let Err(err) = result {
            assert!(
                matches!(err, ClobError::InsufficientBalance { .. }),
                "step {step}: unexpected {err}"
            );
        }

        h.assert_consistent();
        for &trader in &traders {
            let (quote, base) = expected_frozen(&h.ex, trader);
            assert_eq!(h.ex.balance(trader, &usdt()).frozen, quote, "step {step}");
            assert_eq!(h.ex.balance(trader, &uni()).frozen, base, "step {step}");
        }
    }

    let book = h.ex.order_book(&uni()).unwrap();
    assert!(!book.is_crossed());
    // Quote was never withdrawn: trading only moved it around.
    assert_eq!(h.ex.total_supply(&usdt()), dec(60_000));
}
