pub mod dashboard;
pub mod dom;
pub mod logging;
pub mod rpc;
pub mod runtime;
pub mod schedule;
pub mod selector;
pub mod services;
pub mod settings;
pub mod widgets;
