//! Per-height random integer programs mixed into the cn/r main loop.
//!
//! The generator schedules instructions against a simple three-ALU latency
//! model so the resulting program fills a fixed latency budget; an ASIC
//! padding pass then appends ROR/MUL/MUL until the critical path is full.

use crate::primitives::blake256;

const TOTAL_LATENCY: usize = 15 * 3;
const MIN_INSTRUCTIONS: usize = 60;
const MAX_INSTRUCTIONS: usize = 70;
const MAX_RETRIES: usize = 64;
const MAX_ITERATIONS: usize = 256;

/// Input registers r4..r8 are read-only; r0..r3 are written.
const REGISTERS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Mul,
    Add,
    Sub,
    Ror,
    Rol,
    Xor,
}

impl Op {
    const fn index(self) -> usize {
        self as usize
    }

    const fn latency(self) -> usize {
        [3, 2, 1, 2, 2, 1][self.index()]
    }

    const fn asic_latency(self) -> usize {
        [3, 1, 1, 1, 1, 1][self.index()]
    }

    const fn alus(self) -> usize {
        [1, 3, 3, 3, 3, 3][self.index()]
    }

    const fn is_rotation(self) -> bool {
        matches!(self, Op::Ror | Op::Rol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Instruction {
    op: Op,
    dst: u8,
    src: u8,
    constant: u32,
}

/// Byte source for the generator: BLAKE-256 re-hashed in place whenever
/// the current 32 bytes run out.
struct Entropy {
    data: [u8; 32],
    index: usize,
}

impl Entropy {
    fn new(height: u64) -> Self {
        let mut data = [0u8; 32];
        data[..8].copy_from_slice(&height.to_le_bytes());
        data[20] = 0xda;
        Self { data, index: 32 }
    }

    fn reserve(&mut self, bytes: usize) {
        if self.index + bytes > self.data.len() {
            self.data = blake256(&self.data);
            self.index = 0;
        }
    }

    fn byte(&mut self) -> u8 {
        self.reserve(1);
        let b = self.data[self.index];
        self.index += 1;
        b
    }

    fn word(&mut self) -> u32 {
        self.reserve(4);
        let i = self.index;
        self.index += 4;
        u32::from_le_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Program {
    code: Vec<Instruction>,
}

impl Program {
    pub(crate) fn generate(height: u64) -> Self {
        let mut entropy = Entropy::new(height);
        let mut code = Vec::with_capacity(MAX_INSTRUCTIONS);

        loop {
            code.clear();
            let r8_used = schedule(&mut entropy, &mut code);
            if r8_used && (MIN_INSTRUCTIONS..=MAX_INSTRUCTIONS).contains(&code.len()) {
                break;
            }
        }

        tracing::trace!(height, instructions = code.len(), "cn/r program");
        Self { code }
    }

    #[cfg(test)]
    fn reads_r8(&self) -> bool {
        self.code.iter().any(|ins| ins.src == 8)
    }

    pub(crate) fn execute(&self, r: &mut [u32; REGISTERS]) {
        for ins in &self.code {
            let src = r[ins.src as usize];
            let dst = &mut r[ins.dst as usize];
            *dst = match ins.op {
                Op::Mul => dst.wrapping_mul(src),
                Op::Add => dst.wrapping_add(src).wrapping_add(ins.constant),
                Op::Sub => dst.wrapping_sub(src),
                Op::Ror => dst.rotate_right(src % 32),
                Op::Rol => dst.rotate_left(src % 32),
                Op::Xor => *dst ^ src,
            };
        }
    }
}

/// One generation attempt. Returns whether any instruction reads r8.
fn schedule(entropy: &mut Entropy, code: &mut Vec<Instruction>) -> bool {
    let mut latency = [0usize; REGISTERS];
    let mut asic_latency = [0usize; REGISTERS];
    // Encodes the last op that wrote each register so that an identical
    // op on the same operands can be skipped.
    let mut inst_data: [u32; REGISTERS] = [
        0, 1, 2, 3, 0xff_ffff, 0xff_ffff, 0xff_ffff, 0xff_ffff, 0xff_ffff,
    ];
    let mut alu_busy = [[false; 3]; TOTAL_LATENCY + 1];
    let mut rotated = [false; 4];
    let mut rotate_count = 0usize;
    let mut retries = 0usize;
    let mut iterations = 0usize;
    let mut r8_used = false;

    while latency[..4].iter().any(|&l| l < TOTAL_LATENCY) && retries < MAX_RETRIES {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            break;
        }

        let c = entropy.byte();
        let op = match c & 7 {
            0..=2 => Op::Mul,
            3 => Op::Add,
            4 => Op::Sub,
            5 => {
                if (entropy.byte() as i8) >= 0 {
                    Op::Ror
                } else {
                    Op::Rol
                }
            }
            _ => Op::Xor,
        };

        let dst = (c >> 3) & 3;
        let mut src = (c >> 5) & 7;
        let a = dst as usize;
        if matches!(op, Op::Add | Op::Sub | Op::Xor) && a == src as usize {
            src = 8;
        }
        let b = src as usize;

        if op.is_rotation() && rotated[a] {
            continue;
        }

        let signature = ((op.index() as u32) << 8) + ((inst_data[b] & 0xff) << 16);
        if op != Op::Mul && (inst_data[a] & 0xff_ff00) == signature {
            continue;
        }

        let mut next_latency = latency[a].max(latency[b]);
        let mut alu = None;
        while next_latency < TOTAL_LATENCY {
            alu = (0..op.alus()).rev().find(|&i| {
                !alu_busy[next_latency][i]
                    && !(op == Op::Add && alu_busy[next_latency + 1][i])
                    && !(op.is_rotation() && next_latency < rotate_count * op.latency())
            });
            if alu.is_some() {
                break;
            }
            next_latency += 1;
        }

        if next_latency > latency[a] + 7 {
            continue;
        }

        next_latency += op.latency();
        match alu {
            Some(alu) if next_latency <= TOTAL_LATENCY => {
                if op.is_rotation() {
                    rotate_count += 1;
                }
                let start = next_latency - op.latency();
                alu_busy[start][alu] = true;
                latency[a] = next_latency;
                asic_latency[a] = asic_latency[a].max(asic_latency[b]) + op.asic_latency();
                rotated[a] = op.is_rotation();
                inst_data[a] = code.len() as u32 + signature;

                let mut constant = 0;
                if op == Op::Add {
                    alu_busy[start + 1][alu] = true;
                    constant = entropy.word();
                }
                r8_used |= src == 8;
                code.push(Instruction {
                    op,
                    dst,
                    src,
                    constant,
                });

                if code.len() >= MIN_INSTRUCTIONS {
                    break;
                }
            }
            _ => retries += 1,
        }
    }

    pad_for_asic(code, &mut latency, &mut asic_latency);
    r8_used
}

/// Extend the program along the longest ASIC dependency chain.
fn pad_for_asic(
    code: &mut Vec<Instruction>,
    latency: &mut [usize; REGISTERS],
    asic: &mut [usize; REGISTERS],
) {
    const PATTERN: [Op; 3] = [Op::Ror, Op::Mul, Op::Mul];
    let start = code.len();

    while code.len() < MAX_INSTRUCTIONS && asic[..4].iter().all(|&l| l < TOTAL_LATENCY) {
        let (mut min, mut max) = (0, 0);
        for i in 1..4 {
            if asic[i] < asic[min] {
                min = i;
            }
            if asic[i] > asic[max] {
                max = i;
            }
        }

        let op = PATTERN[(code.len() - start) % 3];
        latency[min] = latency[max] + op.latency();
        asic[min] = asic[max] + op.asic_latency();
        code.push(Instruction {
            op,
            dst: min as u8,
            src: max as u8,
            constant: 0,
        });
    }
}

/// Register file carried across main-loop iterations.
pub(crate) struct RandomMath {
    program: Program,
    r: [u32; REGISTERS],
}

impl RandomMath {
    /// `seed` is state bytes 96..112.
    pub(crate) fn new(height: u64, seed: &[u8]) -> Self {
        let mut r = [0u32; REGISTERS];
        for (reg, chunk) in r.iter_mut().zip(seed.chunks_exact(4).take(4)) {
            *reg = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self {
            program: Program::generate(height),
            r,
        }
    }

    /// Value folded into the loaded low word before the multiply.
    pub(crate) fn mask(&self) -> u64 {
        let r = &self.r;
        u64::from(r[0].wrapping_add(r[1])) | (u64::from(r[2].wrapping_add(r[3])) << 32)
    }

    /// Load the read-only inputs, run the program and return the words
    /// folded into `a`.
    pub(crate) fn run(&mut self, a: [u64; 2], b0_lo: u64, b1: [u64; 2]) -> [u64; 2] {
        self.r[4] = a[0] as u32;
        self.r[5] = a[1] as u32;
        self.r[6] = b0_lo as u32;
        self.r[7] = b1[0] as u32;
        self.r[8] = b1[1] as u32;
        self.program.execute(&mut self.r);
        let r = &self.r;
        [
            u64::from(r[2]) | (u64::from(r[3]) << 32),
            u64::from(r[0]) | (u64::from(r[1]) << 32),
        ]
    }
}
