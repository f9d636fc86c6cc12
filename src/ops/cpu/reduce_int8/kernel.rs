//! The multi-axis reduction driver.
//!
//! # Run Stages
//!
//! ```text
//! Setup ─▶ WidenInput ─▶ ReducePass(0) ─▶ … ─▶ ReducePass(N-2) ─▶ FinalReducePass ─▶ Cleanup ─▶ Done
//! ```
//!
//! Every stage can fail. Scratch memory lives in a [`ScratchBuffers`] guard
//! owned by the run, so it is handed back to the allocator on every exit.

use crate::error::{ReduceError, Result};
use crate::runtime::Context;
use crate::tensors::{QuantArg, Tensor};

use super::plan::ReductionPlan;
use super::quant_args::ReduceQuantArgs;
use super::reducers::{Reducer, ReducerPair};
use super::scratch::ScratchBuffers;
use super::{ReduceMode, ReduceParameter, RunStage};

/// Quantized int8 reduce kernel.
///
/// Planning, multiplier derivation and reducer selection happen once in
/// [`ReduceInt8Kernel::new`] (or [`ReduceInt8Kernel::resize`]). [`run`] only
/// allocates scratch and executes passes, so one kernel serves any number of
/// runs on inputs of the planned shape.
///
/// [`run`]: ReduceInt8Kernel::run
#[derive(Debug, Clone)]
pub struct ReduceInt8Kernel {
    param: ReduceParameter,
    plan: ReductionPlan,
    quant: ReduceQuantArgs,
    reducers: ReducerPair,
}

impl ReduceInt8Kernel {
    /// Sets up a kernel for `input`'s shape and the quantization parameters
    /// of `input` and `output`.
    ///
    /// # Errors
    /// Invalid axes or shapes, missing or invalid quantization parameters, and
    /// allocation failures while deriving multipliers.
    pub fn new(param: ReduceParameter, input: &Tensor<i8>, output: &Tensor<i8>) -> Result<Self> {
        let in_arg = input.quant_param()?;
        let out_arg = output.quant_param()?;
        let plan = ReductionPlan::new(input.shape(), &param)?;
        let quant = ReduceQuantArgs::calculate(param.mode, in_arg, out_arg, &plan)?;
        let reducers = ReducerPair::for_mode(param.mode);

        log::debug!(
            "reduce {} setup: shape {:?}, axes {:?} -> {:?}",
            param.mode,
            plan.input_shape,
            plan.axes,
            plan.output_shape
        );

        Ok(Self {
            param,
            plan,
            quant,
            reducers,
        })
    }

    /// Re-plans the kernel for a new input shape, keeping mode, axes and
    /// quantization parameters.
    ///
    /// # Errors
    /// Same as [`ReduceInt8Kernel::new`]. On error the kernel is unchanged.
    pub fn resize(&mut self, input_shape: &[usize]) -> Result<()> {
        let plan = ReductionPlan::new(input_shape, &self.param)?;
        let in_arg = QuantArg::new(self.quant.in_scale, self.quant.in_zp);
        let out_arg = QuantArg::new(self.quant.out_scale, self.quant.out_zp);
        self.quant = ReduceQuantArgs::calculate(self.param.mode, in_arg, out_arg, &plan)?;
        self.plan = plan;
        log::debug!(
            "reduce {} resized to {:?} -> {:?}",
            self.param.mode,
            self.plan.input_shape,
            self.plan.output_shape
        );
        Ok(())
    }

    #[must_use]
    pub fn mode(&self) -> ReduceMode {
        self.param.mode
    }

    #[must_use]
    pub fn plan(&self) -> &ReductionPlan {
        &self.plan
    }

    #[must_use]
    pub fn quant_args(&self) -> &ReduceQuantArgs {
        &self.quant
    }

    /// Shape the output tensor must have.
    #[must_use]
    pub fn output_shape(&self) -> &[usize] {
        &self.plan.output_shape
    }

    /// Reduces `input` into `output` on `ctx`'s pool.
    ///
    /// # Errors
    /// - [`ReduceError::ShapeMismatch`] if either tensor does not match the plan.
    /// - [`ReduceError::ResourceExhausted`] if scratch allocation fails.
    /// - [`ReduceError::TaskFailure`] if a pass overflows.
    ///
    /// Scratch buffers are released before returning in every case.
    pub fn run(&self, ctx: &Context, input: &Tensor<i8>, output: &mut Tensor<i8>) -> Result<()> {
        let mut scratch = ScratchBuffers::new(ctx.allocator());
        let result = self.run_stages(ctx, &mut scratch, input, output);

        log::trace!("reduce {}: {}", self.param.mode, RunStage::Cleanup);
        scratch.release_all();

        match &result {
            Ok(()) => log::trace!("reduce {}: {}", self.param.mode, RunStage::Done),
            Err(err) => log::error!("reduce {} run failed: {err}", self.param.mode),
        }
        result
    }

    fn run_stages(
        &self,
        ctx: &Context,
        scratch: &mut ScratchBuffers<'_>,
        input: &Tensor<i8>,
        output: &mut Tensor<i8>,
    ) -> Result<()> {
        let mode = self.param.mode;
        log::trace!("reduce {mode}: {}", RunStage::Setup);
        if input.shape() != self.plan.input_shape.as_slice() {
            return Err(ReduceError::ShapeMismatch {
                expected: self.plan.input_shape.clone(),
                actual: input.shape().to_vec(),
            });
        }
        let expected_len: usize = self.plan.input_shape.iter().product();
        if input.elements_num() != expected_len {
            log::error!(
                "reduce {mode}: input holds {} elements, shape {:?} needs {expected_len}",
                input.elements_num(),
                input.shape()
            );
            return Err(ReduceError::ShapeMismatch {
                expected: self.plan.input_shape.clone(),
                actual: vec![input.elements_num()],
            });
        }
        if output.elements_num() != self.plan.output_len() {
            return Err(ReduceError::ShapeMismatch {
                expected: self.plan.output_shape.clone(),
                actual: output.shape().to_vec(),
            });
        }

        scratch.allocate(&self.plan.buffer_sizes)?;
        scratch.allocate_input_widen(input.elements_num())?;

        log::trace!("reduce {mode}: {}", RunStage::WidenInput);
        scratch.widen_input(input.data());

        let (widened, buffers) = scratch.split_mut();
        let last = self.plan.num_axes() - 1;

        for i in 0..last {
            let (done, pending) = buffers.split_at_mut(i);
            let src = done.last().map_or(widened, Vec::as_slice);
            self.launch_pass(
                ctx,
                RunStage::ReducePass(i),
                i,
                src,
                pending[0].as_mut_slice(),
                self.reducers.reduce,
            )?;
        }

        let src = buffers.last().map_or(widened, Vec::as_slice);
        self.launch_pass(
            ctx,
            RunStage::FinalReducePass,
            last,
            src,
            output.data_mut(),
            self.reducers.reduce_last,
        )
    }

    fn launch_pass<T: Send>(
        &self,
        ctx: &Context,
        stage: RunStage,
        index: usize,
        src: &[i32],
        dst: &mut [T],
        reduce: Reducer<T>,
    ) -> Result<()> {
        let mode = self.param.mode;
        let pass = self.plan.passes[index];
        let args = self.quant.for_pass(index);
        log::debug!(
            "reduce {mode}: {stage} outer={} axis={} inner={} tasks={}",
            pass.outer_size,
            pass.axis_size,
            pass.inner_size,
            ctx.thread_num().min(pass.outer_size)
        );

        ctx.pool()
            .launch(dst, pass.outer_size, pass.inner_size, |task_id, rows, block| {
                reduce(&pass, rows, src, block, &args).map_err(|source| {
                    log::error!("reduce {mode} error at {stage}, task {task_id}: {source}");
                    ReduceError::TaskFailure {
                        mode,
                        stage,
                        task_id,
                        source,
                    }
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    fn ctx(threads: usize) -> Context {
        Context::new(&RuntimeConfig::default().with_thread_num(threads)).unwrap()
    }

    fn unit(shape: &[usize], data: Vec<i8>) -> Tensor<i8> {
        Tensor::new(shape, data).with_quant_param(1.0, 0)
    }

    fn reduce(mode: ReduceMode, axes: &[i32], input: &Tensor<i8>) -> Result<Tensor<i8>> {
        let template = unit(&[1], vec![0]);
        let kernel = ReduceInt8Kernel::new(ReduceParameter::new(mode, axes), input, &template)?;
        let mut output = Tensor::zeros(kernel.output_shape()).with_quant_param(1.0, 0);
        kernel.run(&ctx(2), input, &mut output)?;
        Ok(output)
    }

    #[test]
    fn mean_of_one_to_four_rounds_half_away() {
        let input = unit(&[2, 2], vec![1, 2, 3, 4]);
        let out = reduce(ReduceMode::Mean, &[0, 1], &input).unwrap();
        assert_eq!(out.shape(), &[1]);
        assert_eq!(out.data(), &[3]);
    }

    #[test]
    fn max_and_min_over_rows() {
        let input = unit(&[2, 3], vec![-5, 7, 2, 0, -3, -9]);
        assert_eq!(reduce(ReduceMode::Max, &[1], &input).unwrap().data(), &[7, 0]);
        assert_eq!(reduce(ReduceMode::Min, &[1], &input).unwrap().data(), &[-5, -9]);
    }

    #[test]
    fn prod_over_all_axes() {
        let input = unit(&[3], vec![2, 3, 4]);
        assert_eq!(reduce(ReduceMode::Prod, &[], &input).unwrap().data(), &[24]);
    }

    #[test]
    fn wrong_input_shape_is_rejected() {
        let input = unit(&[2, 3], vec![0; 6]);
        let kernel =
            ReduceInt8Kernel::new(ReduceParameter::new(ReduceMode::Sum, [1]), &input, &input).unwrap();
        let other = unit(&[3, 2], vec![0; 6]);
        let mut out = unit(&[2], vec![0; 2]);
        assert!(matches!(
            kernel.run(&ctx(1), &other, &mut out),
            Err(ReduceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn input_data_not_matching_its_shape_is_rejected() {
        let mut input = unit(&[2, 3], vec![1; 6]);
        let kernel =
            ReduceInt8Kernel::new(ReduceParameter::new(ReduceMode::Sum, [1]), &input, &input).unwrap();
        input.data.truncate(4);
        let mut out = unit(&[2], vec![0; 2]);
        let err = kernel.run(&ctx(2), &input, &mut out).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::ShapeMismatch { ref actual, .. } if actual == &[4]
        ));
        assert_eq!(out.data(), &[0, 0]);
    }

    #[test]
    fn resize_replans_for_new_shape() {
        let input = unit(&[2, 3], vec![1; 6]);
        let mut kernel =
            ReduceInt8Kernel::new(ReduceParameter::new(ReduceMode::Sum, [1]), &input, &input).unwrap();
        kernel.resize(&[4, 5]).unwrap();
        assert_eq!(kernel.output_shape(), &[4]);

        let bigger = unit(&[4, 5], vec![1; 20]);
        let mut out = unit(&[4], vec![0; 4]);
        kernel.run(&ctx(3), &bigger, &mut out).unwrap();
        assert_eq!(out.data(), &[5, 5, 5, 5]);
    }

    #[test]
    fn kernel_can_run_repeatedly() {
        let input = unit(&[2, 2], vec![1, 2, 3, 4]);
        let kernel =
            ReduceInt8Kernel::new(ReduceParameter::new(ReduceMode::Sum, [0]), &input, &input).unwrap();
        let mut out = unit(&[2], vec![0; 2]);
        for _ in 0..3 {
            kernel.run(&ctx(2), &input, &mut out).unwrap();
            assert_eq!(out.data(), &[4, 6]);
        }
    }
}
