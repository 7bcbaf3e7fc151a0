//! Asset loading: a lenient OBJ parser and the triangle mesh builder.

pub mod mesh;
pub mod obj;

pub use mesh::{MeshData, MeshVertex};
pub use obj::{ObjDocument, load_obj_from_path, load_obj_from_str, parse_obj_str};
