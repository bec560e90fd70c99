//! Scalar and vector adders.

use portsim_core::{PortDecl, PortError, PortRef, PortRegistry, SystemError};
use portsim_system::{StepContext, System};

/// Width of the [`Adder3D`] ports.
const DIM: usize = 3;

/// `output1 = input1 + input2`.
///
/// ```
/// use portsim_systems::Adder;
/// use portsim_system::System;
///
/// let adder = Adder::new().unwrap();
/// assert_eq!(adder.ports().outputs().scalar("output1").unwrap(), 0.0);
/// ```
#[derive(Debug)]
pub struct Adder {
    ports: PortRegistry,
    input1: PortRef,
    input2: PortRef,
    output1: PortRef,
}

impl Adder {
    /// An adder with both inputs at zero.
    pub fn new() -> Result<Self, PortError> {
        let mut ports = PortRegistry::new();
        let input1 = ports.add_input(PortDecl::scalar("input1").with_doc("First term"))?;
        let input2 = ports.add_input(PortDecl::scalar("input2").with_doc("Second term"))?;
        let output1 = ports.add_output(PortDecl::scalar("output1").with_doc("Sum of the inputs"))?;
        Ok(Self {
            ports,
            input1,
            input2,
            output1,
        })
    }
}

impl System for Adder {
    fn name(&self) -> &str {
        "adder"
    }

    fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut PortRegistry {
        &mut self.ports
    }

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let sum = self.ports.scalar_at(self.input1)? + self.ports.scalar_at(self.input2)?;
        self.ports.set_scalar_at(self.output1, sum)?;
        Ok(())
    }
}

/// Element-wise sum of two 3-vectors.
#[derive(Debug)]
pub struct Adder3D {
    ports: PortRegistry,
    input1: PortRef,
    input2: PortRef,
    output1: PortRef,
}

impl Adder3D {
    /// A vector adder with both inputs at `[0, 0, 0]`.
    pub fn new() -> Result<Self, PortError> {
        let mut ports = PortRegistry::new();
        let input1 = ports.add_input(PortDecl::vector("input1", DIM).with_doc("First term"))?;
        let input2 = ports.add_input(PortDecl::vector("input2", DIM).with_doc("Second term"))?;
        let output1 =
            ports.add_output(PortDecl::vector("output1", DIM).with_doc("Sum of the inputs"))?;
        Ok(Self {
            ports,
            input1,
            input2,
            output1,
        })
    }
}

impl System for Adder3D {
    fn name(&self) -> &str {
        "adder3d"
    }

    fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut PortRegistry {
        &mut self.ports
    }

    fn do_step(&mut self, _ctx: &mut StepContext) -> Result<(), SystemError> {
        let mut sum = [0.0; DIM];
        let a = self.ports.vector_at(self.input1)?;
        let b = self.ports.vector_at(self.input2)?;
        for ((s, x), y) in sum.iter_mut().zip(a).zip(b) {
            *s = x + y;
        }
        self.ports.set_vector_at(self.output1, &sum)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsim_core::StepId;
    use proptest::prelude::*;

    fn ctx() -> StepContext {
        StepContext::new(0.0, 0.1, StepId(0))
    }

    #[test]
    fn adder_sums_after_a_step() {
        let mut adder = Adder::new().unwrap();
        adder.ports_mut().inputs_mut().set("input1", 1.234).unwrap();
        assert_eq!(adder.ports().outputs().scalar("output1").unwrap(), 0.0);

        adder.do_step(&mut ctx()).unwrap();
        assert_eq!(adder.ports().outputs().scalar("output1").unwrap(), 1.234);
    }

    #[test]
    fn adder_rejects_vector_input() {
        let mut adder = Adder::new().unwrap();
        let err = adder
            .ports_mut()
            .inputs_mut()
            .set("input1", [0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, PortError::KindMismatch { .. }));
    }

    #[test]
    fn adder3d_starts_at_zero() {
        let adder = Adder3D::new().unwrap();
        assert_eq!(adder.ports().inputs().vector("input1").unwrap(), &[0.0; 3]);
        assert_eq!(adder.ports().outputs().vector("output1").unwrap(), &[0.0; 3]);
    }

    #[test]
    fn adder3d_rejects_wrong_length_and_scalars() {
        let mut adder = Adder3D::new().unwrap();
        let inputs = adder.ports_mut().inputs_mut();
        assert!(matches!(
            inputs.set("input1", [0.0, 0.0]),
            Err(PortError::ShapeMismatch { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            inputs.set("input1", 1.0),
            Err(PortError::KindMismatch { .. })
        ));
    }

    #[test]
    fn unknown_input_is_reported() {
        let adder = Adder3D::new().unwrap();
        assert!(matches!(
            adder.ports().inputs().get("xyxyxy"),
            Err(PortError::UnknownPort { .. })
        ));
    }

    proptest! {
        #[test]
        fn adder3d_adds_elementwise(
            a in prop::array::uniform3(-1e6f64..1e6),
            b in prop::array::uniform3(-1e6f64..1e6),
        ) {
            let mut adder = Adder3D::new().unwrap();
            adder.ports_mut().inputs_mut().set("input1", a).unwrap();
            adder.ports_mut().inputs_mut().set("input2", b).unwrap();
            adder.do_step(&mut ctx()).unwrap();
            let out = adder.ports().outputs().vector("output1").unwrap();
            for i in 0..3 {
                prop_assert_eq!(out[i], a[i] + b[i]);
            }
        }
    }
}
