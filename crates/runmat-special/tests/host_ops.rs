use runmat_special::api::{
    AutogradDecision, DispatchKey, FallbackKind, KernelProfiler, ProfileToken, ScalarType, Tensor,
    TensorData,
};
use runmat_special::{math, HostDevice, SpecialError, SpecialKernels};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

fn kernels() -> SpecialKernels<HostDevice> {
    SpecialKernels::new(HostDevice::default())
}

fn assert_close(got: &[f32], want: &[f32], tol: f32) {
    assert_eq!(got.len(), want.len());
    for (i, (g, w)) in got.iter().zip(want.iter()).enumerate() {
        if w.is_nan() {
            assert!(g.is_nan(), "lane {i}: got {g}, want NaN");
        } else if w.is_infinite() {
            assert_eq!(g, w, "lane {i}");
        } else {
            assert!((g - w).abs() <= tol, "lane {i}: got {g}, want {w}");
        }
    }
}

fn ramp(shape: Vec<usize>) -> Tensor {
    let n: usize = shape.iter().product();
    let data = (0..n).map(|i| 0.3 + i as f32 * 0.7).collect();
    Tensor::from_f32(data, shape).expect("tensor")
}

#[test]
fn lgamma_end_to_end() {
    let k = kernels();
    let x = Tensor::from_f32(vec![0.5, 1.0, 2.0, 5.5], vec![4]).expect("tensor");
    let y = k.lgamma(&x).expect("lgamma");
    assert_eq!(y.shape(), &[4]);
    assert_close(&y.to_f32_vec(), &[0.5724, 0.0, 0.0, 3.9578], 1e-4);
}

#[test]
fn integer_input_promotes_to_f32() {
    let k = kernels();
    let x = Tensor::new(TensorData::I32(vec![1, 2, 3, 4]), vec![2, 2]).expect("tensor");
    let y = k.lgamma(&x).expect("lgamma");
    assert_eq!(y.scalar_type(), ScalarType::F32);
    assert_close(&y.to_f32_vec(), &[0.0, 0.0, 0.693_147_2, 1.791_759_5], 1e-5);

    let u = Tensor::new(TensorData::U32(vec![1, 10]), vec![2]).expect("tensor");
    let d = k.digamma(&u).expect("digamma");
    assert_close(&d.to_f32_vec(), &[-0.577_215_7, 2.251_752_6], 1e-5);
}

#[test]
fn digamma_special_values() {
    let k = kernels();
    let x = Tensor::from_f32(vec![-1.0, -0.0, 0.0, 1.0], vec![4]).expect("tensor");
    let y = k.digamma(&x).expect("digamma");
    assert_close(
        &y.to_f32_vec(),
        &[f32::NAN, f32::INFINITY, f32::NEG_INFINITY, -0.577_215_7],
        1e-5,
    );
}

#[test]
fn polygamma_orders_route_to_matching_kernels() {
    let k = kernels();
    let x = ramp(vec![10]);
    let xs = x.to_f32_vec();

    let p0 = k.polygamma(0, &x).expect("order 0").to_f32_vec();
    let d = k.digamma(&x).expect("digamma").to_f32_vec();
    assert_eq!(p0, d);

    let p1 = k.polygamma(1, &x).expect("order 1").to_f32_vec();
    let want: Vec<f32> = xs.iter().map(|&v| math::calc_trigamma(v)).collect();
    assert_eq!(p1, want);

    let one = Tensor::from_f32(vec![1.0], vec![1]).expect("tensor");
    let p2 = k.polygamma(2, &one).expect("order 2").to_f32_vec();
    assert_close(&p2, &[-2.404_113_8], 1e-3);
}

#[test]
fn non_contiguous_input_matches_contiguous_equivalent() {
    let k = kernels();
    let base = ramp(vec![3, 4]);
    let views = [
        base.transpose(0, 1).expect("transpose"),
        base.narrow(1, 1, 2).expect("narrow"),
    ];
    for view in &views {
        assert!(!view.is_contiguous());
        let packed = view.contiguous();
        assert!(packed.is_contiguous());

        let pairs = [
            (k.lgamma(view), k.lgamma(&packed)),
            (k.digamma(view), k.digamma(&packed)),
            (k.polygamma(3, view), k.polygamma(3, &packed)),
        ];
        for (strided, contiguous) in pairs {
            assert_eq!(
                strided.expect("strided").to_f32_vec(),
                contiguous.expect("contiguous").to_f32_vec()
            );
        }
    }
}

#[test]
fn non_contiguous_output_is_copied_back() {
    let k = kernels();
    let x = ramp(vec![3, 4]);
    let out_base = Tensor::zeros(&[4, 3], ScalarType::F32);
    let out = out_base.transpose(0, 1).expect("transpose");
    assert!(!out.is_contiguous());

    k.digamma_out(&x, &out).expect("digamma_out");

    let want = k.digamma(&x).expect("digamma").to_f32_vec();
    assert_eq!(out.to_f32_vec(), want);
    // The caller's storage holds the results in transposed order.
    let stored = out_base.to_f32_vec();
    assert_eq!(stored[1], want[4]);
    assert_eq!(stored[3], want[1]);
}

#[test]
fn contiguous_views_with_offset_write_in_place() {
    let k = kernels();
    let out_base = Tensor::from_f32(vec![-7.0; 6], vec![3, 2]).expect("tensor");
    let out = out_base.narrow(0, 1, 2).expect("narrow");
    assert!(out.is_contiguous());
    let x = Tensor::from_f32(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).expect("tensor");

    k.lgamma_out(&x, &out).expect("lgamma_out");

    assert_close(
        &out_base.to_f32_vec(),
        &[-7.0, -7.0, 0.0, 0.0, 0.693_147_2, 1.791_759_5],
        1e-5,
    );
}

#[test]
fn in_place_on_shared_storage() {
    let k = kernels();
    let t = Tensor::from_f32(vec![0.5, 1.0, 2.0, 5.5], vec![4]).expect("tensor");
    k.lgamma_out(&t, &t).expect("in place");
    assert_close(&t.to_f32_vec(), &[0.5724, 0.0, 0.0, 3.9578], 1e-4);
}

#[test]
fn double_precision_is_rejected() {
    let k = kernels();
    let x = Tensor::new(TensorData::F64(vec![1.0, 2.0]), vec![2]).expect("tensor");
    match k.lgamma(&x) {
        Err(SpecialError::UnsupportedDtype { op, dtype }) => {
            assert_eq!(op, "lgamma");
            assert_eq!(dtype, ScalarType::F64);
        }
        other => panic!("expected UnsupportedDtype, got {:?}", other.map(|_| ())),
    }

    let f = Tensor::from_f32(vec![1.0, 2.0], vec![2]).expect("tensor");
    let out = Tensor::zeros(&[2], ScalarType::F64);
    assert!(matches!(
        k.digamma_out(&f, &out),
        Err(SpecialError::UnsupportedDtype { op: "digamma", .. })
    ));
}

#[test]
fn integer_output_is_rejected() {
    let k = kernels();
    let x = Tensor::from_f32(vec![1.0], vec![1]).expect("tensor");
    let out = Tensor::zeros(&[1], ScalarType::I32);
    assert!(matches!(
        k.lgamma_out(&x, &out),
        Err(SpecialError::UnsupportedTypePair { .. })
    ));
}

#[test]
fn negative_order_is_rejected() {
    let k = kernels();
    let x = ramp(vec![4]);
    assert!(matches!(
        k.polygamma(-1, &x),
        Err(SpecialError::NegativeOrder { order: -1 })
    ));
    // Dtype is checked first.
    let d = Tensor::new(TensorData::F64(vec![1.0]), vec![1]).expect("tensor");
    assert!(matches!(
        k.polygamma(-1, &d),
        Err(SpecialError::UnsupportedDtype { .. })
    ));
}

#[test]
fn mismatched_output_is_rejected() {
    let k = kernels();
    let x = ramp(vec![4]);
    let out = Tensor::zeros(&[5], ScalarType::F32);
    assert!(matches!(
        k.lgamma_out(&x, &out),
        Err(SpecialError::ShapeMismatch {
            input: 4,
            output: 5,
            ..
        })
    ));
}

#[test]
fn empty_tensors_are_a_no_op() {
    let k = kernels();
    let x = Tensor::zeros(&[0, 3], ScalarType::F32);
    let y = k.lgamma(&x).expect("lgamma");
    assert_eq!(y.numel(), 0);
    assert_eq!(y.shape(), &[0, 3]);
    k.polygamma(4, &x).expect("polygamma");

    let snap = k.telemetry();
    assert_eq!(snap.programs_compiled, 0);
    assert_eq!(snap.dispatches, 0);
}

#[derive(Default)]
struct RecordingProfiler {
    next: AtomicU64,
    events: Mutex<Vec<String>>,
}

impl KernelProfiler for RecordingProfiler {
    fn begin_profile_kernel(&self, kernel: &str, type_key: &str, elements: usize) -> ProfileToken {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.events
            .lock()
            .expect("events")
            .push(format!("begin {kernel} {type_key} {elements}"));
        ProfileToken(id)
    }

    fn end_profile_kernel(&self, token: ProfileToken) {
        self.events
            .lock()
            .expect("events")
            .push(format!("end {}", token.0));
    }
}

#[test]
fn profiler_brackets_each_dispatch() {
    let profiler = Arc::new(RecordingProfiler::default());
    let k = kernels().with_profiler(profiler.clone());
    let x = ramp(vec![4]);
    let ints = Tensor::new(TensorData::I32(vec![1, 2]), vec![2]).expect("tensor");

    k.lgamma(&x).expect("lgamma");
    k.polygamma(3, &ints).expect("polygamma");
    k.lgamma(&Tensor::zeros(&[0], ScalarType::F32)).expect("empty");

    let events = profiler.events.lock().expect("events").clone();
    assert_eq!(
        events,
        vec![
            "begin lgamma f32f32 4".to_string(),
            "end 1".to_string(),
            "begin polygamma i32f32 2".to_string(),
            "end 2".to_string(),
        ]
    );

    let snap = k.telemetry();
    assert_eq!(snap.dispatches, 2);
    assert_eq!(snap.elements, 6);
}

#[test]
fn autograd_policy_for_special_ops() {
    let k = kernels();
    for key in DispatchKey::ALL {
        let policy = k.autograd_policy(key);
        match key {
            DispatchKey::ADInplaceOrView => assert_eq!(policy, Some(FallbackKind::Fallthrough)),
            DispatchKey::AutogradPrivateUse1
            | DispatchKey::AutogradPrivateUse2
            | DispatchKey::AutogradPrivateUse3 => assert_eq!(policy, None),
            _ if key.is_autograd() => {
                assert_eq!(policy, Some(FallbackKind::AutogradFallback), "{key:?}")
            }
            _ => assert_eq!(policy, None),
        }
    }
    assert_eq!(k.autograd_decision(), AutogradDecision::RedispatchBelowAutograd);
}
