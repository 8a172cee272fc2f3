//! End-to-end tests: data port to engine to report.

mod common;

use approx::assert_relative_eq;
use common::*;
use flatland::adapters::csv_adapter::CsvAdapter;
use flatland::adapters::html_report_adapter::HtmlReportAdapter;
use flatland::domain::backtest::{self, BacktestParams};
use flatland::domain::error::BacktestError;
use flatland::domain::signal::{Direction, SignalSelection};
use flatland::domain::trade::Outcome;
use flatland::ports::data_port::DataPort;
use flatland::ports::report_port::ReportPort;
use tempfile::TempDir;

mod engine {
    use super::*;

    #[test]
    fn worked_example_with_third_bar() {
        // c2 closes below c1's low with R1 above threshold: one buy.
        // Levels from c2: target 88 * 1.01 = 88.88, stop 84 * 0.99 = 83.16.
        // c3 closes at 86, inside both, so the trade is forced out at 86.
        let candles = single_buy_series();
        let report = backtest::run(&candles, &BacktestParams::new("BTC")).unwrap();

        assert_eq!(report.trades.len(), 1);
        let t = &report.trades[0];
        assert_eq!(t.direction, Direction::Buy);
        assert_eq!(t.entry_time, ts(1));
        assert_relative_eq!(t.entry_price, 85.0);
        assert_eq!(t.exit_time, ts(2));
        assert_relative_eq!(t.exit_price, 86.0);
        assert_relative_eq!(t.profit, 1.0);
        assert_eq!(t.outcome, Outcome::Neither);
        assert_relative_eq!(t.r1, 360.0);
    }

    #[test]
    fn buy_hits_target() {
        let candles = vec![
            candle(0, 100.0, 90.0, 95.0, 0.0, 0.0),
            candle(1, 88.0, 84.0, 85.0, 0.0, 400.0),
            candle(2, 92.0, 86.0, 90.0, 0.0, 0.0),
            candle(3, 92.0, 80.0, 80.0, 0.0, 0.0),
        ];
        let report = backtest::run(&candles, &BacktestParams::new("BTC")).unwrap();
        let t = &report.trades[0];
        assert_eq!(t.outcome, Outcome::Success);
        assert_eq!(t.exit_time, ts(2));
        assert_relative_eq!(t.profit, 5.0);
        assert_eq!(report.performance.winning_trades, 1);
    }

    #[test]
    fn sell_hits_stop() {
        // Sell at 112 above c0's high; stop at 115 * 1.01 = 116.15.
        let candles = vec![
            candle(0, 110.0, 100.0, 105.0, 0.0, 0.0),
            candle(1, 115.0, 108.0, 112.0, 500.0, 0.0),
            candle(2, 114.0, 111.0, 113.0, 0.0, 0.0),
            candle(3, 121.0, 117.0, 120.0, 0.0, 0.0),
        ];
        let report = backtest::run(&candles, &BacktestParams::new("BTC")).unwrap();
        let t = &report.trades[0];
        assert_eq!(t.direction, Direction::Sell);
        assert_eq!(t.outcome, Outcome::Failure);
        assert_eq!(t.exit_time, ts(3));
        assert_relative_eq!(t.profit, -8.0);
        assert_relative_eq!(report.performance.profit_factor, 0.0);
        assert_relative_eq!(report.performance.net_profit, -8.0);
    }

    #[test]
    fn signal_on_last_candle_exits_immediately() {
        let candles = vec![
            candle(0, 100.0, 90.0, 95.0, 0.0, 0.0),
            candle(1, 88.0, 84.0, 85.0, 360.0, 0.0),
        ];
        let report = backtest::run(&candles, &BacktestParams::new("BTC")).unwrap();
        let t = &report.trades[0];
        assert_eq!(t.entry_time, t.exit_time);
        assert_relative_eq!(t.profit, 0.0);
        assert_ne!(t.outcome, Outcome::Success);
    }

    #[test]
    fn threshold_is_strict() {
        let mut candles = single_buy_series();
        candles[1].r1 = 350.0;
        let err = backtest::run(&candles, &BacktestParams::new("BTC")).unwrap_err();
        assert_eq!(err, BacktestError::NoSignalsFound { threshold: 350.0 });
    }

    #[test]
    fn limit_caps_trades_for_both_selections() {
        let candles = zigzag(40);
        for selection in [SignalSelection::Earliest, SignalSelection::MostRecent] {
            let params = BacktestParams {
                selection,
                ..BacktestParams::new("BTC")
            };
            let report = backtest::run(&candles, &params).unwrap();
            assert_eq!(report.trades.len(), 15);
            assert_eq!(report.performance.total_trades, 15);
            assert!(report.trades.windows(2).all(|w| w[0].entry_time < w[1].entry_time));
        }
    }

    #[test]
    fn most_recent_keeps_tail_of_series() {
        let candles = zigzag(40);
        let report = backtest::run(&candles, &BacktestParams::new("BTC")).unwrap();
        assert_eq!(report.trades.first().unwrap().entry_time, ts(25));
        assert_eq!(report.trades.last().unwrap().entry_time, ts(39));
    }

    #[test]
    fn json_shape() {
        let report = backtest::run(&single_buy_series(), &BacktestParams::new("BTC")).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["symbol"], "BTC");
        assert_eq!(json["trades"][0]["direction"], "BUY");
        assert_eq!(json["trades"][0]["outcome"], "neither");
        assert_eq!(json["trades"][0]["entry_time"], "2024-01-01T00:30:00");
        assert_eq!(json["performance"]["total_trades"], 1);
        assert!(json["performance"]["profit_factor"].is_null());
    }
}

mod with_ports {
    use super::*;

    #[test]
    fn mock_port_range_feeds_engine() {
        let port = MockDataPort::new().with_candles("ETH", zigzag(20));
        let candles = port
            .fetch_candles("ETH", "30m", Some(ts(10)), Some(ts(14)))
            .unwrap();
        assert_eq!(candles.len(), 5);

        let report = backtest::run(&candles, &BacktestParams::new("ETH")).unwrap();
        // The first candle in range has no predecessor, so four signals remain.
        assert_eq!(report.trades.len(), 4);
        assert_eq!(report.trades[0].entry_time, ts(11));
    }

    #[test]
    fn csv_to_report() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "BTC", "30m", &zigzag(12));
        write_csv(dir.path(), "ETH", "30m", &single_buy_series());

        let port = CsvAdapter::new(dir.path().to_path_buf());
        assert_eq!(port.list_symbols("30m").unwrap(), vec!["BTC", "ETH"]);

        let candles = port.fetch_candles("ETH", "30m", None, None).unwrap();
        assert_eq!(candles, single_buy_series());

        let params = BacktestParams {
            signal_limit: 5,
            ..BacktestParams::new("ETH")
        };
        let report = backtest::run(&candles, &params).unwrap();
        assert_eq!(report.trades.len(), 1);
        let html = HtmlReportAdapter::new(params.signal_limit)
            .render(&report)
            .unwrap();
        assert!(html.contains("Flatland Backtest for ETH (Last 5 Signals)"));
    }

    #[test]
    fn csv_and_mock_agree() {
        let dir = TempDir::new().unwrap();
        let series = zigzag(30);
        write_csv(dir.path(), "SOL", "30m", &series);

        let csv = CsvAdapter::new(dir.path().to_path_buf());
        let mock = MockDataPort::new().with_candles("SOL", series);
        let params = BacktestParams::new("SOL");

        let from_csv = csv.fetch_candles("SOL", "30m", None, None).unwrap();
        let from_mock = mock.fetch_candles("SOL", "30m", None, None).unwrap();
        let a = backtest::run(&from_csv, &params).unwrap();
        let b = backtest::run(&from_mock, &params).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_round_trip_feeds_engine() {
        use flatland::adapters::sqlite_adapter::SqliteAdapter;

        let store = SqliteAdapter::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store.insert_candles("BTC", "30m", &zigzag(16)).unwrap();

        let candles = store.fetch_candles("BTC", "30m", None, None).unwrap();
        assert_eq!(candles, zigzag(16));

        let report = backtest::run(&candles, &BacktestParams::new("BTC")).unwrap();
        assert_eq!(report.trades.len(), 15);
    }
}
