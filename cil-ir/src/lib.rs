//! Data model shared between the CIL front end and its consumers.

pub mod method;
pub mod operand;
pub mod operation;
pub mod types;

pub use method::{
    FieldInfo, FieldTable, LocalVariableInfo, MethodInfo, ParameterInfo, RuntimeInformation,
};
pub use operand::{Constant, Operand, OperandTag};
pub use operation::OperationInfo;
pub use types::{ClrType, NumericCategory, StackType};
