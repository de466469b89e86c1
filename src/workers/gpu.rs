//! OpenCL mining worker
//!
//! A [`Miner`] owns one device together with its context, command queue and
//! program. The program is compiled lazily on first use so that device
//! listing and option validation stay cheap.

use crate::core::constants::{
    ADDRESS_LENGTH, PREFIX_LENGTH, SHORT_HASH_LENGTH, SOLUTION_BUFFER_SIZE,
};
use crate::core::{score, sha256, Nonce, Prefix, SharedState, Solution};
use crate::error::{Error, Result};
use crate::workers::device::DeviceExt;
use ocl::{Buffer, Context, Device, Kernel, MemFlags, Program, Queue};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// OpenCL kernel source, embedded at build time
const KERNEL_SRC: &str = include_str!("kernels/krist.cl");

/// Canned inputs for the kernel self-test
const TEST_INPUTS: [&str; 16] = [
    "abc", "def", "ghi", "jkl", "mno", "pqr", "stu", "vwx", "yzA", "BCD", "EFG", "HIJ", "KLM",
    "NOP", "QRS", "TUV",
];

/// Per-device mining configuration
#[derive(Debug, Clone)]
pub struct MinerOptions {
    prefix: Prefix,
    worksize: Option<usize>,
    vecsize: Option<u16>,
    extra_opts: String,
}

impl MinerOptions {
    /// Create miner options.
    ///
    /// `worksize` defaults to the product of the device's max work item
    /// sizes; `vecsize` defaults to the device's preferred char vector width
    /// and must otherwise be one of 1, 2, 4, 8 or 16. `extra_opts` is passed
    /// to the OpenCL compiler verbatim.
    pub fn new(
        prefix: Prefix,
        worksize: Option<usize>,
        vecsize: Option<u16>,
        extra_opts: impl Into<String>,
    ) -> Result<Self> {
        if let Some(vecsize) = vecsize {
            if !matches!(vecsize, 1 | 2 | 4 | 8 | 16) {
                return Err(Error::invalid_argument(format!(
                    "Invalid vector width: {}",
                    vecsize
                )));
            }
        }

        if worksize == Some(0) {
            return Err(Error::invalid_argument("Worksize must be positive"));
        }

        Ok(Self {
            prefix,
            worksize,
            vecsize,
            extra_opts: extra_opts.into(),
        })
    }

    /// The nonce prefix assigned to this miner
    pub fn prefix(&self) -> Prefix {
        self.prefix
    }
}

/// A miner bound to one OpenCL device
pub struct Miner {
    device: Device,
    name: String,
    context: Context,
    queue: Queue,
    options: MinerOptions,
    vecsize: usize,
    worksize: usize,
    program: Option<Program>,
}

impl fmt::Display for Miner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (vecsize {}, worksize {})",
            self.name, self.vecsize, self.worksize
        )
    }
}

impl Miner {
    /// Construct the per-device context and queue. Does not yet compile the
    /// kernel program.
    pub fn new(device: Device, options: MinerOptions) -> Result<Self> {
        let name = device.name()?;
        let context = Context::builder().devices(device).build()?;
        let queue = Queue::new(&context, device, None)?;

        let vecsize = match options.vecsize {
            Some(vecsize) => vecsize as usize,
            None => device.preferred_vector_width_char()? as usize,
        };

        let worksize = match options.worksize {
            Some(worksize) => worksize,
            None => device.max_work_item_sizes()?.iter().product(),
        };

        Ok(Self {
            device,
            name,
            context,
            queue,
            options,
            vecsize,
            worksize,
            program: None,
        })
    }

    /// The device name as reported by OpenCL
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compile the program on first use; later calls reuse the handle.
    fn ensure_built(&mut self) -> Result<Program> {
        if let Some(program) = &self.program {
            return Ok(program.clone());
        }

        let args = format!("-D VECSIZE={} {}", self.vecsize, self.options.extra_opts);
        let args = args.trim_end().to_string();

        debug!(device = %self.name, %args, "Building kernel program");

        let program = Program::builder()
            .devices(self.device)
            .src(KERNEL_SRC)
            .cmplr_opt(&args)
            .build(&self.context)
            .map_err(|e| Error::build_failed(e.to_string(), args))?;

        self.program = Some(program.clone());
        Ok(program)
    }

    /// Verify the device against the host reference implementation.
    ///
    /// Runs the `testDigest55` and `testScore` kernels over the canned
    /// inputs and compares each lane with the host SHA-256 and score.
    pub fn run_tests(&mut self) -> Result<()> {
        let program = self.ensure_built()?;
        let vecsize = self.vecsize;

        let input_buf = Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().read_only())
            .len(64 * vecsize)
            .build()?;
        let hash_buf = Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .len(32 * vecsize)
            .build()?;
        let score_buf = Buffer::<i64>::builder()
            .queue(self.queue.clone())
            .len(vecsize)
            .build()?;

        let digest_kernel = Kernel::builder()
            .program(&program)
            .name("testDigest55")
            .queue(self.queue.clone())
            .global_work_size(1)
            .arg(&input_buf)
            .arg(3i32)
            .arg(&hash_buf)
            .build()?;

        let score_kernel = Kernel::builder()
            .program(&program)
            .name("testScore")
            .queue(self.queue.clone())
            .global_work_size(1)
            .arg(&hash_buf)
            .arg(&score_buf)
            .build()?;

        for chunk in TEST_INPUTS.chunks(vecsize) {
            let mut interleaved = vec![0u8; 64 * vecsize];
            for (lane, input) in chunk.iter().enumerate() {
                for (j, byte) in input.bytes().enumerate() {
                    interleaved[vecsize * j + lane] = byte;
                }
            }
            input_buf.write(&interleaved).enq()?;

            unsafe {
                digest_kernel.enq()?;
            }

            let mut hashes = vec![0u8; 32 * vecsize];
            hash_buf.read(&mut hashes).enq()?;
            self.queue.finish()?;

            for (lane, input) in chunk.iter().enumerate() {
                let mut got = [0u8; 32];
                for (j, byte) in got.iter_mut().enumerate() {
                    *byte = hashes[vecsize * j + lane];
                }

                let expected = sha256(input.as_bytes());
                if got != expected {
                    return Err(Error::test_failed(
                        *input,
                        hex::encode(expected),
                        hex::encode(got),
                    ));
                }
            }

            unsafe {
                score_kernel.enq()?;
            }

            let mut scores = vec![0i64; vecsize];
            score_buf.read(&mut scores).enq()?;
            self.queue.finish()?;

            for (lane, input) in chunk.iter().enumerate() {
                let expected = score(&sha256(input.as_bytes()));
                if scores[lane] != expected {
                    return Err(Error::test_failed(
                        *input,
                        expected.to_string(),
                        scores[lane].to_string(),
                    ));
                }
            }
        }

        info!(device = %self.name, "Kernel self-test passed");
        Ok(())
    }

    /// Blocking production loop; returns when the shared state is stopped.
    ///
    /// OpenCL runtime errors are propagated so the orchestrator can stop the
    /// remaining miners; the loop itself never retries.
    pub fn run(&mut self, state: Arc<SharedState>) -> Result<()> {
        let program = self.ensure_built()?;
        let vecsize = self.vecsize;
        let worksize = self.worksize;
        let step = (worksize * vecsize) as i64;

        let address_buf = Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().read_only())
            .len(ADDRESS_LENGTH)
            .build()?;
        let block_buf = Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().read_only())
            .len(SHORT_HASH_LENGTH)
            .build()?;
        let prefix_buf = Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().read_only())
            .len(PREFIX_LENGTH)
            .build()?;
        let solution_buf = Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .len(SOLUTION_BUFFER_SIZE)
            .build()?;

        let kernel = Kernel::builder()
            .program(&program)
            .name("kristMiner")
            .queue(self.queue.clone())
            .global_work_size(worksize)
            .arg(&address_buf)
            .arg(&block_buf)
            .arg(&prefix_buf)
            .arg(0i64)
            .arg(0i64)
            .arg(&solution_buf)
            .build()?;

        address_buf.write(&state.address().as_bytes()[..]).enq()?;
        prefix_buf
            .write(&self.options.prefix().as_bytes()[..])
            .enq()?;

        let mut solution = vec![0u8; SOLUTION_BUFFER_SIZE];

        while let Some(target) = state.get_target() {
            debug!(device = %self.name, %target, "Mining");

            block_buf.write(&target.prev_block.as_bytes()[..]).enq()?;
            solution.fill(0);
            solution_buf.write(&solution).enq()?;
            kernel.set_arg(4, target.work)?;

            let mut offset: i64 = 1;

            while state.get_target_now() == Some(target) && !state.is_stopped() {
                kernel.set_arg(3, offset)?;

                unsafe {
                    kernel.enq()?;
                }

                solution_buf.read(&mut solution).enq()?;
                self.queue.finish()?;

                if solution[0] != 0 {
                    let nonce = Nonce::from_solution_buffer(&solution)?;
                    debug!(device = %self.name, %nonce, "Kernel reported solution");
                    state.push_solution(Solution::new(target, state.address(), nonce));

                    solution.fill(0);
                    solution_buf.write(&solution).enq()?;
                    self.queue.flush()?;
                }

                state.add_hashes(step as u64);
                offset += step;
            }
        }

        Ok(())
    }
}
