//! In-memory stand-in for the native prediction library.

#![allow(dead_code)]

use std::cell::RefCell;
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};

use mxpredict::inference::{CreateArgs, MxFloat, MxUint, PredictApi, PredictorHandle};

/// Arguments seen by one create call, copied out of the native records.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCall {
    pub symbol: String,
    pub params_len: usize,
    pub dev_type: i32,
    pub dev_id: i32,
    pub num_input_nodes: u32,
    pub keys: Vec<String>,
    pub shape_indptr: Vec<u32>,
    pub shape_data: Vec<u32>,
    pub output_keys: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct State {
    pub creates: Vec<CreateCall>,
    pub inputs: Vec<(String, Vec<f32>)>,
    pub forwards: usize,
    pub output_requests: Vec<(u32, usize)>,
    pub frees: Vec<usize>,
    pub last_error_calls: usize,
    pub output_shape: Vec<u32>,
    pub null_shape_data: bool,
    pub null_handle: bool,
    fail: Option<(&'static str, c_int)>,
    last_error: String,
    next_handle: usize,
}

/// Records every call and can be told to fail one operation.
#[derive(Debug, Default)]
pub struct FakeEngine {
    pub state: RefCell<State>,
}

unsafe fn read_keys(ptrs: &[*const c_char]) -> Vec<String> {
    ptrs.iter()
        .map(|&p| CStr::from_ptr(p).to_string_lossy().into_owned())
        .collect()
}

impl FakeEngine {
    pub fn new(output_shape: &[u32]) -> Self {
        let engine = Self::default();
        engine.state.borrow_mut().output_shape = output_shape.to_vec();
        engine
    }

    /// Make `op` return `code`, with `message` as the last error.
    pub fn fail_on(&self, op: &'static str, code: c_int, message: &str) {
        let mut state = self.state.borrow_mut();
        state.fail = Some((op, code));
        state.last_error = message.to_string();
    }

    fn status(&self, op: &'static str) -> c_int {
        match self.state.borrow().fail {
            Some((name, code)) if name == op => code,
            _ => 0,
        }
    }

    fn record_create(&self, args: &CreateArgs<'_>, output_keys: Option<Vec<String>>) {
        let call = CreateCall {
            symbol: args.symbol.to_string_lossy().into_owned(),
            params_len: args.params.len(),
            dev_type: args.dev_type,
            dev_id: args.dev_id,
            num_input_nodes: args.num_input_nodes,
            keys: unsafe { read_keys(&args.input_keys[..args.num_input_nodes as usize]) },
            shape_indptr: args.input_shape_indptr.to_vec(),
            shape_data: args.input_shape_data.to_vec(),
            output_keys,
        };
        self.state.borrow_mut().creates.push(call);
    }

    fn new_handle(&self) -> PredictorHandle {
        let mut state = self.state.borrow_mut();
        if state.null_handle {
            return std::ptr::null_mut();
        }
        state.next_handle += 1;
        (0x1000 + state.next_handle) as *mut c_void
    }

    pub fn input_lengths(&self) -> Vec<usize> {
        self.state.borrow().inputs.iter().map(|(_, d)| d.len()).collect()
    }
}

impl PredictApi for FakeEngine {
    unsafe fn create(&self, args: &CreateArgs<'_>, out: &mut PredictorHandle) -> c_int {
        self.record_create(args, None);
        let code = self.status("MXPredCreate");
        if code >= 0 {
            *out = self.new_handle();
        }
        code
    }

    unsafe fn create_partial_out(
        &self,
        args: &CreateArgs<'_>,
        output_keys: &[*const c_char],
        out: &mut PredictorHandle,
    ) -> c_int {
        self.record_create(args, Some(read_keys(output_keys)));
        let code = self.status("MXPredCreatePartialOut");
        if code == 0 {
            *out = self.new_handle();
        }
        code
    }

    unsafe fn set_input(&self, _handle: PredictorHandle, key: &CStr, data: &[MxFloat]) -> c_int {
        let key = key.to_string_lossy().into_owned();
        self.state.borrow_mut().inputs.push((key, data.to_vec()));
        self.status("MXPredSetInput")
    }

    unsafe fn forward(&self, _handle: PredictorHandle) -> c_int {
        self.state.borrow_mut().forwards += 1;
        self.status("MXPredForward")
    }

    unsafe fn output_shape(
        &self,
        _handle: PredictorHandle,
        _index: MxUint,
        shape_data: &mut *const MxUint,
        shape_ndim: &mut MxUint,
    ) -> c_int {
        let code = self.status("MXPredGetOutputShape");
        if code == 0 {
            let state = self.state.borrow();
            *shape_ndim = state.output_shape.len() as MxUint;
            *shape_data = if state.null_shape_data {
                std::ptr::null()
            } else {
                state.output_shape.as_ptr()
            };
        }
        code
    }

    unsafe fn output(
        &self,
        _handle: PredictorHandle,
        index: MxUint,
        data: &mut [MxFloat],
    ) -> c_int {
        self.state
            .borrow_mut()
            .output_requests
            .push((index, data.len()));
        for (i, v) in data.iter_mut().enumerate() {
            *v = i as f32 * 0.5;
        }
        self.status("MXPredGetOutput")
    }

    unsafe fn free(&self, handle: PredictorHandle) -> c_int {
        self.state.borrow_mut().frees.push(handle as usize);
        self.status("MXPredFree")
    }

    fn last_error(&self) -> String {
        let mut state = self.state.borrow_mut();
        state.last_error_calls += 1;
        state.last_error.clone()
    }
}
