// ==========================================
// 多租户 CRM - 导入管道
// ==========================================
// 职责: 线索批量导入全流程（解析 / 归一化 / 校验 / 查重 / 落库 / 遥测）
// 分层: 纯函数工具（normalize / date_resolver）在底，
//       编排器（lead_importer_impl）在顶，中间各组件只依赖 trait
// ==========================================

pub mod date_resolver;
pub mod duplicate_context;
pub mod enum_normalizer;
pub mod error;
pub mod file_parser;
pub mod lead_importer_impl;
pub mod lead_importer_trait;
pub mod normalize;
pub mod row_validator;
pub mod schema_adapter;
pub mod telemetry;

pub use duplicate_context::{DuplicateContext, DuplicateContextBuilder, KeySets};
pub use enum_normalizer::EnumNormalizer;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, HeaderMapping, UniversalFileParser};
pub use lead_importer_impl::LeadImporterImpl;
pub use lead_importer_trait::{ImportRequest, LeadImporter};
pub use row_validator::RowValidator;
pub use schema_adapter::LeadSchemaAdapter;
pub use telemetry::ImportTelemetryService;
