//! # danci-insight - 学习记忆与时序分析核心库
//!
//! 本 crate 提供纯 Rust 实现的学习分析算法:
//!
//! - **Forgetting Curve** - 艾宾浩斯遗忘曲线建模与回忆预测
//! - **SM-2 Spaced Repetition** - SuperMemo 间隔重复调度
//! - **Temporal Patterns** - 学习节律、习惯模式与动量检测
//! - **Time-Series Analytics** - 指标聚合、趋势、异常与相关性分析
//!
//! ## 设计理念
//!
//! 本 crate 的设计目标:
//! - **纯 Rust** - 无 I/O、无全局状态，可在任何宿主应用中使用
//! - **全函数** - 任何可达输入都不会 panic，退化输入返回中性默认值
//! - **确定性** - 相同输入永远产生相同输出，便于持久化与回放
//! - **高性能** - 批量模型计算支持并行处理
//!
//! ## 模块结构
//!
//! - [`forgetting`] - 遗忘曲线 (衰减率、稳定性、SM-2 调度、巩固分析)
//! - [`temporal`] - 时序模式 (节律检测、会话习惯、学习动量)
//! - [`timeseries`] - 时序统计 (周期聚合、趋势、异常、跨指标相关)
//! - [`stats`] - 统计原语 (均值、方差、Pearson、自相关、分位数)
//! - [`types`] - 公共类型和常量
//!
//! ## 使用示例
//!
//! ```rust
//! use chrono::Utc;
//! use danci_insight::{generate_schedule, ItemMetrics};
//!
//! let now = Utc::now();
//! let mut item = ItemMetrics::new("word-1", now);
//! item.record_interaction(true, 1200.0, now);
//!
//! // 首次复习: 间隔 1 天, 易度因子 2.5
//! let schedule = generate_schedule(&item, now, 5);
//! assert_eq!(schedule.interval_days, 1);
//! assert!((schedule.ease_factor - 2.5).abs() < 1e-10);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod stats;
pub mod types;
pub mod forgetting;
pub mod temporal;
pub mod timeseries;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

/// 重新导出遗忘曲线模块
pub use forgetting::{
    analyze_consolidation, batch_compute_models, compute_model, generate_schedule, insights,
    predict_success, ActivityKind, ConsolidationActivity, ForgettingCurveInsights,
    ForgettingCurveModel, ItemRanking, MemoryConsolidation, ReviewPrediction, ReviewPriority,
    SpacedRepetitionSchedule, StabilityTrend,
};

/// 重新导出时序模式模块
pub use temporal::{
    analyze_momentum, analyze_rhythm, detect_patterns, EnergyDeclinePattern, LearningMomentum,
    LearningRhythm, MomentumDirection, PatternKind, PeakWindow, TemporalPattern,
};

/// 重新导出时序统计模块
pub use timeseries::{
    aggregate, analyze_patterns, correlate_metrics, AggregationPeriod, Anomaly, AnomalySeverity,
    MetricCorrelation, MetricPatternAnalysis, SeasonalProfile, TimeSeriesAggregate,
    TrendDirection, TrendSummary,
};
