//! Host-owned records laid out the way the C prediction API expects them.
//!
//! Every native-compatible buffer built here owns its memory and releases
//! it on drop, so a table lives exactly as long as the scope that built it,
//! whichever way that scope exits.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use super::ffi::MxUint;
use super::options::InputNode;
use crate::error::{MxError, Result};

/// Convert a name into a C string, rejecting interior NUL bytes.
pub(crate) fn c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| MxError::validation(format!("{} contains a NUL byte: {:?}", what, value)))
}

/// An array of C strings usable as `const char**`.
#[derive(Debug)]
pub struct CStrTable {
    // Pointers into `owned`; the heap buffers of a CString do not move when
    // the Vec reallocates or the table is moved.
    ptrs: Vec<*const c_char>,
    owned: Vec<CString>,
}

impl CStrTable {
    pub fn new<I, S>(names: I, what: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owned = names
            .into_iter()
            .map(|name| c_string(name.as_ref(), what))
            .collect::<Result<Vec<_>>>()?;
        let ptrs = owned.iter().map(|s| s.as_ptr()).collect();
        Ok(Self { ptrs, owned })
    }

    pub fn as_slice(&self) -> &[*const c_char] {
        &self.ptrs
    }

    pub fn len(&self) -> usize {
        self.ptrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ptrs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CStr> {
        self.owned.get(index).map(CString::as_c_str)
    }
}

/// CSR-style shape description of a list of input nodes.
///
/// `indptr` has one more entry than there are nodes: node `i` owns
/// `data[indptr[i]..indptr[i + 1]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeTable {
    pub indptr: Vec<MxUint>,
    pub data: Vec<MxUint>,
}

impl ShapeTable {
    pub fn new(nodes: &[InputNode]) -> Result<Self> {
        let mut indptr = Vec::with_capacity(nodes.len() + 1);
        let mut data = Vec::new();
        indptr.push(0);
        for node in nodes {
            data.extend_from_slice(node.shape());
            let end = MxUint::try_from(data.len())
                .map_err(|_| MxError::validation("too many input shape dimensions"))?;
            indptr.push(end);
        }
        Ok(Self { indptr, data })
    }
}

/// Input keys and shapes marshalled together, in node order.
#[derive(Debug)]
pub struct InputTable {
    pub keys: CStrTable,
    pub shapes: ShapeTable,
    num_nodes: MxUint,
}

impl InputTable {
    pub fn new(nodes: &[InputNode]) -> Result<Self> {
        let num_nodes = MxUint::try_from(nodes.len())
            .map_err(|_| MxError::validation("too many input nodes"))?;
        Ok(Self {
            keys: CStrTable::new(nodes.iter().map(InputNode::key), "input key")?,
            shapes: ShapeTable::new(nodes)?,
            num_nodes,
        })
    }

    pub fn num_nodes(&self) -> MxUint {
        self.num_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_table_offsets() {
        let nodes = [
            InputNode::new("data", [1, 3, 224, 224]),
            InputNode::new("mask", [1, 224]),
            InputNode::new("scale", [1]),
        ];
        let table = ShapeTable::new(&nodes).unwrap();
        assert_eq!(table.indptr, vec![0, 4, 6, 7]);
        assert_eq!(table.data, vec![1, 3, 224, 224, 1, 224, 1]);
    }

    #[test]
    fn test_cstr_table_pointers_stay_valid_after_move() {
        let table = CStrTable::new(["data", "softmax_label"], "input key").unwrap();
        let moved = table;
        assert_eq!(moved.len(), 2);
        for (i, &ptr) in moved.as_slice().iter().enumerate() {
            let read = unsafe { CStr::from_ptr(ptr) };
            assert_eq!(Some(read), moved.get(i));
        }
        assert_eq!(moved.get(1).unwrap().to_str().unwrap(), "softmax_label");
    }

    #[test]
    fn test_cstr_table_rejects_nul() {
        let err = CStrTable::new(["ok", "bad\0key"], "input key").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("input key"));
    }

    #[test]
    fn test_input_table() {
        let nodes = [InputNode::new("data", [2, 3, 4, 4])];
        let table = InputTable::new(&nodes).unwrap();
        assert_eq!(table.num_nodes(), 1);
        assert_eq!(table.shapes.indptr, vec![0, 4]);
        assert!(!table.keys.is_empty());
    }
}
