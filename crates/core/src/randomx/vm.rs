//! Register machine interpreter and the per-hash program chain.

use super::aes_gen::{fill_1r, fill_4r, hash_1r};
use super::float::{self, RoundingMode};
use super::program::{Instr, Masks, Mem, Operand, Program, FSCAL_MASK, PROGRAM_BYTES};
use super::superscalar::{mulh, smulh};
use super::{blake2b256, blake2b512, RandomXConfig};
use crate::codec::{alloc_arena, read_u32_le, read_u64_le, write_u64_le};
use crate::error::Result;
use crate::params::RANDOMX_DATASET_EXTRA_SIZE;

/// Low 56 bits of a converted integer kept when loading into group E.
const DYNAMIC_MANTISSA_MASK: u64 = (1 << 56) - 1;
const EXPONENT_SIZE: u64 = 11;
const MANTISSA_SIZE: u64 = 52;
const EXPONENT_BIAS: u64 = 1023;
const DYNAMIC_EXPONENT_BITS: u64 = 4;
const STATIC_EXPONENT_BITS: u64 = 4;
const CONST_EXPONENT_BITS: u64 = 0x300;

const MEMORY_ADDRESS_MASK: u64 = 0x7FFF_FFC0;

/// Integer registers r0..r7 then float groups f, e and a, two lanes each.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RegisterFile {
    pub(crate) r: [u64; 8],
    pub(crate) f: [[f64; 2]; 4],
    pub(crate) e: [[f64; 2]; 4],
    pub(crate) a: [[f64; 2]; 4],
}

impl RegisterFile {
    pub(crate) fn to_bytes(&self) -> [u8; 256] {
        let mut out = [0u8; 256];
        let floats = self.f.iter().chain(&self.e).chain(&self.a).flatten();
        let words = self.r.iter().copied().chain(floats.map(|x| x.to_bits()));
        for (chunk, word) in out.chunks_exact_mut(8).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

/// Positive double with exponent in 1023..=1054 from the top five bits
/// of `entropy` and its low 52 bits as mantissa.
fn small_positive_float(entropy: u64) -> f64 {
    let exponent = ((entropy >> 59) + EXPONENT_BIAS) & ((1 << EXPONENT_SIZE) - 1);
    let mantissa = entropy & ((1 << MANTISSA_SIZE) - 1);
    f64::from_bits((exponent << MANTISSA_SIZE) | mantissa)
}

/// Exponent and low mantissa bits forced onto group E values.
fn float_mask(entropy: u64) -> u64 {
    const MASK22: u64 = (1 << 22) - 1;
    let exponent = CONST_EXPONENT_BITS
        | ((entropy >> (64 - STATIC_EXPONENT_BITS)) << DYNAMIC_EXPONENT_BITS);
    (entropy & MASK22) | (exponent << MANTISSA_SIZE)
}

fn to_e(x: f64, mask: u64) -> f64 {
    f64::from_bits((x.to_bits() & DYNAMIC_MANTISSA_MASK) | mask)
}

fn read_i32_pair(scratchpad: &[u8], offset: usize) -> [f64; 2] {
    [
        f64::from(read_u32_le(scratchpad, offset) as i32),
        f64::from(read_u32_le(scratchpad, offset + 4) as i32),
    ]
}

/// Scratchpad, program buffer and registers for one variant.
pub(crate) struct Vm {
    config: RandomXConfig,
    masks: Masks,
    scratchpad: Vec<u8>,
    program: Vec<u8>,
    reg: RegisterFile,
    mode: RoundingMode,
}

impl Vm {
    pub(crate) fn new(config: RandomXConfig) -> Result<Self> {
        Ok(Self {
            config,
            masks: Masks::new(config.scratchpad_l2, config.scratchpad_l3),
            scratchpad: alloc_arena(config.scratchpad_l3)?,
            program: alloc_arena(PROGRAM_BYTES)?,
            reg: RegisterFile::default(),
            mode: RoundingMode::Nearest,
        })
    }

    pub(crate) fn config(&self) -> &RandomXConfig {
        &self.config
    }

    /// Hash `input`; `item` returns dataset item `index` as eight words.
    pub(crate) fn hash<F>(&mut self, input: &[u8], item: F) -> [u8; 32]
    where
        F: Fn(u64) -> [u64; 8],
    {
        let mut seed = blake2b512(input);
        fill_1r(&mut seed, &mut self.scratchpad);
        self.mode = RoundingMode::Nearest;

        for _ in 1..self.config.program_count {
            self.run(&seed, &item);
            seed = blake2b512(&self.reg.to_bytes());
        }
        self.run(&seed, &item);

        let fingerprint = hash_1r(&self.scratchpad);
        for (lane, chunk) in self.reg.a.iter_mut().flatten().zip(fingerprint.chunks_exact(8)) {
            *lane = f64::from_bits(read_u64_le(chunk, 0));
        }
        blake2b256(&self.reg.to_bytes())
    }

    fn run<F>(&mut self, seed: &[u8; 64], item: &F)
    where
        F: Fn(u64) -> [u64; 8],
    {
        fill_4r(seed, &mut self.program);
        let program = Program::decode(&self.program, self.masks);
        let entropy = &program.entropy;

        for (i, lanes) in self.reg.a.iter_mut().enumerate() {
            *lanes = [
                small_positive_float(entropy[2 * i]),
                small_positive_float(entropy[2 * i + 1]),
            ];
        }
        let mut ma = (entropy[8] & MEMORY_ADDRESS_MASK) as u32;
        let mut mx = entropy[10] as u32;
        let select = entropy[12];
        let read_reg = [
            (select & 1) as usize,
            2 + ((select >> 1) & 1) as usize,
            4 + ((select >> 2) & 1) as usize,
            6 + ((select >> 3) & 1) as usize,
        ];
        let dataset_offset = (entropy[13] % (RANDOMX_DATASET_EXTRA_SIZE / 64 + 1)) * 64;
        let e_mask = [float_mask(entropy[14]), float_mask(entropy[15])];

        let l3_line = (self.config.scratchpad_l3 as u32 / 64 - 1) * 64;
        let mut sp0 = mx;
        let mut sp1 = ma;
        self.reg.r = [0; 8];

        for _ in 0..self.config.program_iterations {
            let mix = self.reg.r[read_reg[0]] ^ self.reg.r[read_reg[1]];
            sp0 = (sp0 ^ mix as u32) & l3_line;
            sp1 = (sp1 ^ (mix >> 32) as u32) & l3_line;
            let (p0, p1) = (sp0 as usize, sp1 as usize);

            for (i, r) in self.reg.r.iter_mut().enumerate() {
                *r ^= read_u64_le(&self.scratchpad, p0 + 8 * i);
            }
            for (i, f) in self.reg.f.iter_mut().enumerate() {
                *f = read_i32_pair(&self.scratchpad, p1 + 8 * i);
            }
            for (i, e) in self.reg.e.iter_mut().enumerate() {
                let [lo, hi] = read_i32_pair(&self.scratchpad, p1 + 32 + 8 * i);
                *e = [to_e(lo, e_mask[0]), to_e(hi, e_mask[1])];
            }

            self.execute(&program.code, e_mask);

            mx ^= (self.reg.r[read_reg[2]] ^ self.reg.r[read_reg[3]]) as u32;
            mx &= MEMORY_ADDRESS_MASK as u32;
            let words = item((dataset_offset + u64::from(ma)) / 64);
            for (r, w) in self.reg.r.iter_mut().zip(words) {
                *r ^= w;
            }
            core::mem::swap(&mut mx, &mut ma);

            for (i, &r) in self.reg.r.iter().enumerate() {
                write_u64_le(&mut self.scratchpad, p1 + 8 * i, r);
            }
            for (i, (f, e)) in self.reg.f.iter_mut().zip(&self.reg.e).enumerate() {
                for lane in 0..2 {
                    let bits = f[lane].to_bits() ^ e[lane].to_bits();
                    f[lane] = f64::from_bits(bits);
                    write_u64_le(&mut self.scratchpad, p0 + 16 * i + 8 * lane, bits);
                }
            }
            sp0 = 0;
            sp1 = 0;
        }
    }

    fn address(&self, mem: Mem) -> usize {
        let base = mem.base.map_or(0, |b| self.reg.r[b]);
        (base.wrapping_add(mem.imm) & mem.mask) as usize
    }

    fn load(&self, mem: Mem) -> u64 {
        read_u64_le(&self.scratchpad, self.address(mem))
    }

    fn value(&self, operand: Operand) -> u64 {
        match operand {
            Operand::Reg(src) => self.reg.r[src],
            Operand::Imm(imm) => imm,
        }
    }

    fn execute(&mut self, code: &[Instr], e_mask: [u64; 2]) {
        let mut pc = 0;
        while pc < code.len() {
            let mode = self.mode;
            match code[pc] {
                Instr::IAddRs { dst, src, shift, imm } => {
                    let v = (self.reg.r[src] << shift).wrapping_add(imm);
                    self.reg.r[dst] = self.reg.r[dst].wrapping_add(v);
                }
                Instr::IAddM { dst, mem } => {
                    self.reg.r[dst] = self.reg.r[dst].wrapping_add(self.load(mem));
                }
                Instr::ISubR { dst, src } => {
                    self.reg.r[dst] = self.reg.r[dst].wrapping_sub(self.value(src));
                }
                Instr::ISubM { dst, mem } => {
                    self.reg.r[dst] = self.reg.r[dst].wrapping_sub(self.load(mem));
                }
                Instr::IMulR { dst, src } => {
                    self.reg.r[dst] = self.reg.r[dst].wrapping_mul(self.value(src));
                }
                Instr::IMulM { dst, mem } => {
                    self.reg.r[dst] = self.reg.r[dst].wrapping_mul(self.load(mem));
                }
                Instr::IMulhR { dst, src } => {
                    self.reg.r[dst] = mulh(self.reg.r[dst], self.reg.r[src]);
                }
                Instr::IMulhM { dst, mem } => {
                    self.reg.r[dst] = mulh(self.reg.r[dst], self.load(mem));
                }
                Instr::ISmulhR { dst, src } => {
                    self.reg.r[dst] = smulh(self.reg.r[dst], self.reg.r[src]);
                }
                Instr::ISmulhM { dst, mem } => {
                    self.reg.r[dst] = smulh(self.reg.r[dst], self.load(mem));
                }
                Instr::INegR { dst } => self.reg.r[dst] = self.reg.r[dst].wrapping_neg(),
                Instr::IXorR { dst, src } => self.reg.r[dst] ^= self.value(src),
                Instr::IXorM { dst, mem } => self.reg.r[dst] ^= self.load(mem),
                Instr::IRorR { dst, src } => {
                    let n = (self.value(src) & 63) as u32;
                    self.reg.r[dst] = self.reg.r[dst].rotate_right(n);
                }
                Instr::IRolR { dst, src } => {
                    let n = (self.value(src) & 63) as u32;
                    self.reg.r[dst] = self.reg.r[dst].rotate_left(n);
                }
                Instr::ISwapR { dst, src } => self.reg.r.swap(dst, src),
                Instr::FSwapR { dst } => {
                    if dst < 4 {
                        self.reg.f[dst].swap(0, 1);
                    } else {
                        self.reg.e[dst - 4].swap(0, 1);
                    }
                }
                Instr::FAddR { dst, src } => {
                    for lane in 0..2 {
                        let f = &mut self.reg.f[dst][lane];
                        *f = float::add(*f, self.reg.a[src][lane], mode);
                    }
                }
                Instr::FSubR { dst, src } => {
                    for lane in 0..2 {
                        let f = &mut self.reg.f[dst][lane];
                        *f = float::sub(*f, self.reg.a[src][lane], mode);
                    }
                }
                Instr::FAddM { dst, mem } => {
                    let x = read_i32_pair(&self.scratchpad, self.address(mem));
                    for lane in 0..2 {
                        let f = &mut self.reg.f[dst][lane];
                        *f = float::add(*f, x[lane], mode);
                    }
                }
                Instr::FSubM { dst, mem } => {
                    let x = read_i32_pair(&self.scratchpad, self.address(mem));
                    for lane in 0..2 {
                        let f = &mut self.reg.f[dst][lane];
                        *f = float::sub(*f, x[lane], mode);
                    }
                }
                Instr::FScalR { dst } => {
                    for f in &mut self.reg.f[dst] {
                        *f = f64::from_bits(f.to_bits() ^ FSCAL_MASK);
                    }
                }
                Instr::FMulR { dst, src } => {
                    for lane in 0..2 {
                        let e = &mut self.reg.e[dst][lane];
                        *e = float::mul(*e, self.reg.a[src][lane], mode);
                    }
                }
                Instr::FDivM { dst, mem } => {
                    let x = read_i32_pair(&self.scratchpad, self.address(mem));
                    for lane in 0..2 {
                        let e = &mut self.reg.e[dst][lane];
                        *e = float::div(*e, to_e(x[lane], e_mask[lane]), mode);
                    }
                }
                Instr::FSqrtR { dst } => {
                    for e in &mut self.reg.e[dst] {
                        *e = float::sqrt(*e, mode);
                    }
                }
                Instr::CBranch {
                    dst,
                    imm,
                    mask,
                    resume,
                } => {
                    self.reg.r[dst] = self.reg.r[dst].wrapping_add(imm);
                    if self.reg.r[dst] & mask == 0 {
                        pc = resume;
                        continue;
                    }
                }
                Instr::CFround { src, rotate } => {
                    self.mode = RoundingMode::from_bits(self.reg.r[src].rotate_right(rotate));
                }
                Instr::IStore { mem, src } => {
                    let at = self.address(mem);
                    write_u64_le(&mut self.scratchpad, at, self.reg.r[src]);
                }
                Instr::Nop => {}
            }
            pc += 1;
        }
    }
}
