//! 수집 파이프라인의 기본 타입.

pub mod data_kind;
pub mod sink_key;
pub mod ticker;
pub mod window;

pub use data_kind::*;
pub use sink_key::*;
pub use ticker::*;
pub use window::*;
