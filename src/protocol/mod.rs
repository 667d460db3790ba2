pub mod column_definition;
pub mod command;
pub mod packet;
pub mod primitive;
pub mod response;
pub mod row;

pub use column_definition::ColumnDefinitionBytes;
pub use row::NullBitmap;
