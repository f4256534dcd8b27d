pub mod flow_platform;
pub mod group_crawler;
pub mod web_form;

pub use flow_platform::{FlowPlatformAdapter, FlowRecord, FlowResultConfiguration};
pub use group_crawler::{GroupCrawlerAdapter, GroupMessageRecord};
pub use web_form::{QuestionConfiguration, WebFormAdapter, WebFormRecord};
