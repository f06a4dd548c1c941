pub mod properties;
pub mod shader_binding_table;
