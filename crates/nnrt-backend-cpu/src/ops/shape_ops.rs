//! Metadata-driven operators: reshapes that reuse the input buffer under
//! new dimensions, plus the `Shape` probe and the inference passthroughs.

use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::operator::Operator;
use nnrt::tensor::{shape, Tensor, INDEX_TYPES};

pub struct Reshape;

impl Operator for Reshape {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 2 && INDEX_TYPES.contains(&inputs[1].dtype())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let requested = inputs[1].index_data()?;
        let dims = shape::reshape_dims(inputs[0].dims(), &requested)?;
        Ok(vec![inputs[0].clone().with_dims(dims)?])
    }
}

pub struct Flatten {
    axis: i64,
}

impl Flatten {
    pub fn new() -> Flatten {
        Flatten { axis: 1 }
    }
}

impl Default for Flatten {
    fn default() -> Flatten {
        Flatten::new()
    }
}

impl Operator for Flatten {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.axis = attrs.get_int_or("axis", 1)?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let rank = x.rank() as i64;
        // axis == rank is allowed: everything collapses into the first
        // output dimension
        if self.axis < -rank || self.axis > rank {
            return Err(Error::shape(format!(
                "flatten axis {} is out of range for rank {rank}",
                self.axis
            )));
        }
        let axis = if self.axis < 0 {
            (self.axis + rank) as usize
        } else {
            self.axis as usize
        };
        let dims = shape::flatten_dims(x.dims(), axis);
        Ok(vec![x.clone().with_dims(dims.to_vec())?])
    }
}

pub struct Squeeze {
    axes: Vec<i64>,
}

impl Squeeze {
    pub fn new() -> Squeeze {
        Squeeze { axes: Vec::new() }
    }
}

impl Default for Squeeze {
    fn default() -> Squeeze {
        Squeeze::new()
    }
}

impl Operator for Squeeze {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.axes = attrs.get_ints_or("axes", Vec::new())?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let dims = shape::squeeze_dims(x.dims(), &self.axes)?;
        Ok(vec![x.clone().with_dims(dims)?])
    }
}

pub struct Unsqueeze {
    axes: Vec<i64>,
}

impl Unsqueeze {
    pub fn new() -> Unsqueeze {
        Unsqueeze { axes: Vec::new() }
    }
}

impl Default for Unsqueeze {
    fn default() -> Unsqueeze {
        Unsqueeze::new()
    }
}

impl Operator for Unsqueeze {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.axes = attrs.get_ints("axes")?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let dims = shape::unsqueeze_dims(x.dims(), &self.axes)?;
        Ok(vec![x.clone().with_dims(dims)?])
    }
}

/// Reports the input's dimensions as an int64 vector.
pub struct Shape;

impl Operator for Shape {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let x = inputs[0];
        let dims: Vec<i64> = x.dims().iter().map(|&d| d as i64).collect();
        Ok(vec![Tensor::from_i64(vec![x.rank()], dims)?])
    }
}

pub struct Identity;

impl Operator for Identity {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![inputs[0].clone()])
    }
}

/// At inference dropout is the identity on its data output; the ratio is
/// still validated so malformed models fail at compile time.
pub struct Dropout;

impl Operator for Dropout {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        let ratio = attrs.get_float_or("ratio", 0.5)?;
        if !(0.0..1.0).contains(&ratio) {
            return Err(Error::configuration(format!(
                "dropout ratio must lie in [0, 1), got {ratio}"
            )));
        }
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![inputs[0].clone()])
    }
}
