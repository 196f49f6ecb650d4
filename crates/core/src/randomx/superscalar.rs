//! SuperscalarHash: random integer programs sized against a simulated
//! three-port out-of-order core.
//!
//! The generator decodes 16 bytes of x86 per cycle into one of six fixed
//! slot layouts, schedules every micro-op on ports P0/P1/P5 and picks
//! operands that are ready in time. Generation stops once the ports are
//! saturated or the latency budget is used up. Eight programs, all drawn
//! from one [`Blake2Generator`], turn cache lines into dataset items.

use super::blake2_gen::Blake2Generator;
use crate::params::RANDOMX_SUPERSCALAR_LATENCY;

const MAX_PROGRAM_SIZE: usize = 512;
const CYCLE_MAP_SIZE: usize = RANDOMX_SUPERSCALAR_LATENCY + 4;
const LOOK_FORWARD_CYCLES: usize = 4;
const MAX_THROWAWAY_COUNT: usize = 256;

/// `lea` cannot take r13 as a base without a displacement.
const REGISTER_NEEDS_DISPLACEMENT: usize = 5;

const P0: u8 = 1;
const P1: u8 = 2;
const P5: u8 = 4;
const P01: u8 = P0 | P1;
const P05: u8 = P0 | P5;
const P015: u8 = P0 | P1 | P5;

type PortMap = [[u8; 3]; CYCLE_MAP_SIZE];

/// One x86 macro-op: up to two micro-ops, each a set of usable ports.
/// Zero ports means the op is eliminated at rename.
#[derive(Debug, Clone, Copy)]
struct MacroOp {
    latency: usize,
    uop1: u8,
    uop2: u8,
    dependent: bool,
}

impl MacroOp {
    const fn new(latency: usize, uop1: u8, uop2: u8) -> Self {
        Self {
            latency,
            uop1,
            uop2,
            dependent: false,
        }
    }

    const fn dependent(self) -> Self {
        Self {
            dependent: true,
            ..self
        }
    }
}

const SUB_RR: MacroOp = MacroOp::new(1, P015, 0);
const XOR_RR: MacroOp = MacroOp::new(1, P015, 0);
const LEA_SIB: MacroOp = MacroOp::new(1, P01, 0);
const IMUL_RR: MacroOp = MacroOp::new(3, P1, 0);
const ROR_RI: MacroOp = MacroOp::new(1, P05, 0);
const ADD_RI: MacroOp = MacroOp::new(1, P015, 0);
const XOR_RI: MacroOp = MacroOp::new(1, P015, 0);
const MOV_RR: MacroOp = MacroOp::new(0, 0, 0);
const MUL_R: MacroOp = MacroOp::new(4, P1, P5);
const IMUL_R: MacroOp = MacroOp::new(4, P1, P5);
const MOV_RI64: MacroOp = MacroOp::new(1, P015, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalarOp {
    ISubR,
    IXorR,
    IAddRs,
    IMulR,
    IRorC,
    IAddC7,
    IXorC7,
    IAddC8,
    IXorC8,
    IAddC9,
    IXorC9,
    IMulhR,
    ISmulhR,
    IMulRcp,
}

impl ScalarOp {
    fn macro_ops(self) -> &'static [MacroOp] {
        const DEPENDENT_IMUL: MacroOp = IMUL_RR.dependent();
        match self {
            Self::ISubR => &[SUB_RR],
            Self::IXorR => &[XOR_RR],
            Self::IAddRs => &[LEA_SIB],
            Self::IMulR => &[IMUL_RR],
            Self::IRorC => &[ROR_RI],
            Self::IAddC7 | Self::IAddC8 | Self::IAddC9 => &[ADD_RI],
            Self::IXorC7 | Self::IXorC8 | Self::IXorC9 => &[XOR_RI],
            Self::IMulhR => &[MOV_RR, MUL_R, MOV_RR],
            Self::ISmulhR => &[MOV_RR, IMUL_R, MOV_RR],
            Self::IMulRcp => &[MOV_RI64, DEPENDENT_IMUL],
        }
    }

    /// Macro-op that writes the destination register.
    fn result_op(self) -> usize {
        match self {
            Self::IMulhR | Self::ISmulhR | Self::IMulRcp => 1,
            _ => 0,
        }
    }

    /// Macro-op at which the destination is chosen.
    fn dst_op(self) -> usize {
        match self {
            Self::IMulRcp => 1,
            _ => 0,
        }
    }

    /// Macro-op at which the source is chosen, if there is a source.
    fn src_op(self) -> Option<usize> {
        match self {
            Self::ISubR | Self::IXorR | Self::IAddRs | Self::IMulR => Some(0),
            Self::IMulhR | Self::ISmulhR => Some(1),
            _ => None,
        }
    }

    fn is_multiplication(self) -> bool {
        matches!(
            self,
            Self::IMulR | Self::IMulhR | Self::ISmulhR | Self::IMulRcp
        )
    }
}

/// x86 decoder slot layouts, 16 bytes per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoder {
    B484,
    B7333,
    B3733,
    B493,
    B4444,
    B3310,
}

impl Decoder {
    fn slots(self) -> &'static [usize] {
        match self {
            Self::B484 => &[4, 8, 4],
            Self::B7333 => &[7, 3, 3, 3],
            Self::B3733 => &[3, 7, 3, 3],
            Self::B493 => &[4, 9, 3],
            Self::B4444 => &[4, 4, 4, 4],
            Self::B3310 => &[3, 3, 10],
        }
    }

    fn fetch_next(
        previous: Option<ScalarOp>,
        cycle: usize,
        mul_count: usize,
        rng: &mut Blake2Generator,
    ) -> Self {
        // A 128-bit multiply is two uops; the next cycle can only fit 3-3-10.
        if matches!(previous, Some(ScalarOp::IMulhR | ScalarOp::ISmulhR)) {
            return Self::B3310;
        }
        // Keep the multiplier port busy.
        if mul_count < cycle + 1 {
            return Self::B4444;
        }
        if previous == Some(ScalarOp::IMulRcp) {
            return if rng.byte() & 1 != 0 {
                Self::B484
            } else {
                Self::B493
            };
        }
        [Self::B484, Self::B7333, Self::B3733, Self::B493][(rng.byte() & 3) as usize]
    }
}

#[derive(Debug, Clone, Copy)]
struct RegisterInfo {
    latency: usize,
    last_group: Option<ScalarOp>,
    last_par: i64,
}

impl Default for RegisterInfo {
    fn default() -> Self {
        Self {
            latency: 0,
            last_group: None,
            last_par: -1,
        }
    }
}

/// Instruction being decoded.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    op: Option<ScalarOp>,
    src: Option<usize>,
    dst: usize,
    modifier: u8,
    imm32: u32,
    /// Operations in one group must not be applied twice in a row to the
    /// same register with the same parameter.
    group: ScalarOp,
    group_par: i64,
    can_reuse: bool,
    group_par_is_source: bool,
}

impl Candidate {
    const NULL: Self = Self {
        op: None,
        src: None,
        dst: 0,
        modifier: 0,
        imm32: 0,
        group: ScalarOp::ISubR,
        group_par: -1,
        can_reuse: false,
        group_par_is_source: false,
    };

    fn size(&self) -> usize {
        self.op.map_or(0, |op| op.macro_ops().len())
    }

    fn create(op: ScalarOp, rng: &mut Blake2Generator) -> Self {
        let mut c = Self {
            op: Some(op),
            group: op,
            ..Self::NULL
        };
        match op {
            ScalarOp::ISubR => {
                c.group = ScalarOp::IAddRs;
                c.group_par_is_source = true;
            }
            ScalarOp::IXorR | ScalarOp::IMulR => c.group_par_is_source = true,
            ScalarOp::IAddRs => {
                c.modifier = rng.byte();
                c.group_par_is_source = true;
            }
            ScalarOp::IRorC => loop {
                c.imm32 = u32::from(rng.byte() & 63);
                if c.imm32 != 0 {
                    break;
                }
            },
            ScalarOp::IAddC7 | ScalarOp::IAddC8 | ScalarOp::IAddC9 => {
                c.imm32 = rng.word();
                c.group = ScalarOp::IAddC7;
            }
            ScalarOp::IXorC7 | ScalarOp::IXorC8 | ScalarOp::IXorC9 => {
                c.imm32 = rng.word();
                c.group = ScalarOp::IXorC7;
            }
            ScalarOp::IMulhR | ScalarOp::ISmulhR => {
                c.can_reuse = true;
                c.group_par = i64::from(rng.word());
            }
            ScalarOp::IMulRcp => loop {
                c.imm32 = rng.word();
                if !c.imm32.is_power_of_two() && c.imm32 != 0 {
                    break;
                }
            },
        }
        c
    }

    /// Pick an instruction whose first macro-op fits a slot of `size` bytes.
    fn for_slot(rng: &mut Blake2Generator, size: usize, decoder: Decoder, is_last: bool) -> Self {
        use ScalarOp::*;
        let op = match size {
            3 if is_last => [ISubR, IXorR, IMulhR, ISmulhR][(rng.byte() & 3) as usize],
            3 => [ISubR, IXorR][(rng.byte() & 1) as usize],
            4 if decoder == Decoder::B4444 && !is_last => IMulR,
            4 => [IRorC, IAddRs][(rng.byte() & 1) as usize],
            7 => [IXorC7, IAddC7][(rng.byte() & 1) as usize],
            8 => [IXorC8, IAddC8][(rng.byte() & 1) as usize],
            9 => [IXorC9, IAddC9][(rng.byte() & 1) as usize],
            _ => IMulRcp,
        };
        Self::create(op, rng)
    }

    fn select_source(
        &mut self,
        cycle: usize,
        regs: &[RegisterInfo; 8],
        rng: &mut Blake2Generator,
    ) -> bool {
        let available: Vec<usize> = (0..8).filter(|&i| regs[i].latency <= cycle).collect();

        // With two candidates for lea, r13 must be the source.
        if available.len() == 2
            && self.op == Some(ScalarOp::IAddRs)
            && available.contains(&REGISTER_NEEDS_DISPLACEMENT)
        {
            self.src = Some(REGISTER_NEEDS_DISPLACEMENT);
            self.group_par = REGISTER_NEEDS_DISPLACEMENT as i64;
            return true;
        }

        match select_register(&available, rng) {
            Some(reg) => {
                self.src = Some(reg);
                if self.group_par_is_source {
                    self.group_par = reg as i64;
                }
                true
            }
            None => false,
        }
    }

    fn select_destination(
        &mut self,
        cycle: usize,
        allow_chained_mul: bool,
        regs: &[RegisterInfo; 8],
        rng: &mut Blake2Generator,
    ) -> bool {
        let available: Vec<usize> = (0..8)
            .filter(|&i| {
                let reg = &regs[i];
                reg.latency <= cycle
                    && (self.can_reuse || self.src != Some(i))
                    && (allow_chained_mul
                        || self.group != ScalarOp::IMulR
                        || reg.last_group != Some(ScalarOp::IMulR))
                    && (reg.last_group != Some(self.group) || reg.last_par != self.group_par)
                    && (self.op != Some(ScalarOp::IAddRs) || i != REGISTER_NEEDS_DISPLACEMENT)
            })
            .collect();

        match select_register(&available, rng) {
            Some(reg) => {
                self.dst = reg;
                true
            }
            None => false,
        }
    }
}

fn select_register(available: &[usize], rng: &mut Blake2Generator) -> Option<usize> {
    match available.len() {
        0 => None,
        1 => Some(available[0]),
        n => Some(available[rng.word() as usize % n]),
    }
}

/// Earliest cycle at or after `cycle` with a free port for `uop`, trying
/// P5, then P0, then P1.
fn schedule_uop(uop: u8, busy: &mut PortMap, cycle: usize, commit: bool) -> Option<usize> {
    const ORDER: [(u8, usize); 3] = [(P5, 2), (P0, 0), (P1, 1)];
    for (c, ports) in busy.iter_mut().enumerate().skip(cycle) {
        for (port, slot) in ORDER {
            if uop & port != 0 && ports[slot] == 0 {
                if commit {
                    ports[slot] = uop;
                }
                return Some(c);
            }
        }
    }
    None
}

/// Two-uop macro-ops are only placed where both uops issue in one cycle.
fn schedule_mop(
    mop: &MacroOp,
    busy: &mut PortMap,
    mut cycle: usize,
    dep_cycle: usize,
    commit: bool,
) -> Option<usize> {
    if mop.dependent {
        cycle = cycle.max(dep_cycle);
    }
    if mop.uop1 == 0 {
        return Some(cycle);
    }
    if mop.uop2 == 0 {
        return schedule_uop(mop.uop1, busy, cycle, commit);
    }
    for c in cycle..CYCLE_MAP_SIZE {
        let first = schedule_uop(mop.uop1, busy, c, false);
        let second = schedule_uop(mop.uop2, busy, c, false);
        if first.is_some() && first == second {
            if commit {
                schedule_uop(mop.uop1, busy, c, true);
                schedule_uop(mop.uop2, busy, c, true);
            }
            return first;
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScalarInstruction {
    op: ScalarOp,
    dst: u8,
    src: u8,
    /// Shift for IADD_RS, rotation for IROR_C, sign-extended constant or
    /// reciprocal otherwise.
    operand: u64,
}

impl ScalarInstruction {
    fn new(c: &Candidate, op: ScalarOp) -> Self {
        let operand = match op {
            ScalarOp::IAddRs => u64::from((c.modifier >> 2) % 4),
            ScalarOp::IRorC => u64::from(c.imm32),
            ScalarOp::IAddC7
            | ScalarOp::IAddC8
            | ScalarOp::IAddC9
            | ScalarOp::IXorC7
            | ScalarOp::IXorC8
            | ScalarOp::IXorC9 => sign_extend(c.imm32),
            ScalarOp::IMulRcp => reciprocal(c.imm32),
            _ => 0,
        };
        Self {
            op,
            dst: c.dst as u8,
            src: c.src.unwrap_or(c.dst) as u8,
            operand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SuperscalarProgram {
    code: Vec<ScalarInstruction>,
    address_register: usize,
}

impl SuperscalarProgram {
    pub(crate) fn generate(rng: &mut Blake2Generator) -> Self {
        let mut busy: PortMap = [[0; 3]; CYCLE_MAP_SIZE];
        let mut regs = [RegisterInfo::default(); 8];
        let mut code = Vec::with_capacity(MAX_PROGRAM_SIZE);

        let mut current = Candidate::NULL;
        let mut mop_index = 0;
        let mut cycle = 0;
        let mut dep_cycle = 0;
        let mut saturated = false;
        let mut mul_count = 0;
        let mut throw_away = 0;

        let mut decode_cycle = 0;
        while decode_cycle < RANDOMX_SUPERSCALAR_LATENCY
            && !saturated
            && code.len() < MAX_PROGRAM_SIZE
        {
            let decoder = Decoder::fetch_next(current.op, decode_cycle, mul_count, rng);
            let slots = decoder.slots();
            let mut slot = 0;

            while slot < slots.len() {
                let top_cycle = cycle;

                if mop_index >= current.size() {
                    if saturated || code.len() >= MAX_PROGRAM_SIZE {
                        break;
                    }
                    current = Candidate::for_slot(rng, slots[slot], decoder, slot + 1 == slots.len());
                    mop_index = 0;
                }
                let Some(op) = current.op else { break };
                let mop = op.macro_ops()[mop_index];

                let Some(mut schedule_cycle) =
                    schedule_mop(&mop, &mut busy, cycle, dep_cycle, false)
                else {
                    saturated = true;
                    break;
                };

                if op.src_op() == Some(mop_index) {
                    let mut forward = 0;
                    while forward < LOOK_FORWARD_CYCLES
                        && !current.select_source(schedule_cycle, &regs, rng)
                    {
                        schedule_cycle += 1;
                        cycle += 1;
                        forward += 1;
                    }
                    if forward == LOOK_FORWARD_CYCLES {
                        if throw_away < MAX_THROWAWAY_COUNT {
                            throw_away += 1;
                            mop_index = current.size();
                            continue;
                        }
                        current = Candidate::NULL;
                        break;
                    }
                }

                if op.dst_op() == mop_index {
                    let mut forward = 0;
                    while forward < LOOK_FORWARD_CYCLES
                        && !current.select_destination(schedule_cycle, throw_away > 0, &regs, rng)
                    {
                        schedule_cycle += 1;
                        cycle += 1;
                        forward += 1;
                    }
                    if forward == LOOK_FORWARD_CYCLES {
                        if throw_away < MAX_THROWAWAY_COUNT {
                            throw_away += 1;
                            mop_index = current.size();
                            continue;
                        }
                        current = Candidate::NULL;
                        break;
                    }
                }
                throw_away = 0;

                let Some(schedule_cycle) =
                    schedule_mop(&mop, &mut busy, schedule_cycle, schedule_cycle, true)
                else {
                    saturated = true;
                    break;
                };
                dep_cycle = schedule_cycle + mop.latency;

                if op.result_op() == mop_index {
                    let reg = &mut regs[current.dst];
                    reg.latency = dep_cycle;
                    reg.last_group = Some(current.group);
                    reg.last_par = current.group_par;
                }

                slot += 1;
                mop_index += 1;
                if schedule_cycle >= RANDOMX_SUPERSCALAR_LATENCY {
                    saturated = true;
                }
                cycle = top_cycle;

                if mop_index >= current.size() {
                    code.push(ScalarInstruction::new(&current, op));
                    mul_count += usize::from(op.is_multiplication());
                }
            }
            cycle += 1;
            decode_cycle += 1;
        }

        let address_register = address_register(&code);
        Self {
            code,
            address_register,
        }
    }

    /// Register with the longest dependency chain assuming unit latency and
    /// unlimited parallelism.
    pub(crate) fn address_register(&self) -> usize {
        self.address_register
    }

    pub(crate) fn len(&self) -> usize {
        self.code.len()
    }

    pub(crate) fn execute(&self, r: &mut [u64; 8]) {
        for ins in &self.code {
            let src = r[ins.src as usize];
            let dst = &mut r[ins.dst as usize];
            *dst = match ins.op {
                ScalarOp::ISubR => dst.wrapping_sub(src),
                ScalarOp::IXorR => *dst ^ src,
                ScalarOp::IAddRs => dst.wrapping_add(src << ins.operand),
                ScalarOp::IMulR => dst.wrapping_mul(src),
                ScalarOp::IRorC => dst.rotate_right(ins.operand as u32),
                ScalarOp::IAddC7 | ScalarOp::IAddC8 | ScalarOp::IAddC9 => {
                    dst.wrapping_add(ins.operand)
                }
                ScalarOp::IXorC7 | ScalarOp::IXorC8 | ScalarOp::IXorC9 => *dst ^ ins.operand,
                ScalarOp::IMulhR => mulh(*dst, src),
                ScalarOp::ISmulhR => smulh(*dst, src),
                ScalarOp::IMulRcp => dst.wrapping_mul(ins.operand),
            };
        }
    }
}

fn address_register(code: &[ScalarInstruction]) -> usize {
    let mut latency = [0usize; 8];
    for ins in code {
        let dst = ins.dst as usize;
        let src = ins.src as usize;
        let via_dst = latency[dst] + 1;
        let via_src = if dst != src { latency[src] + 1 } else { 0 };
        latency[dst] = via_dst.max(via_src);
    }
    let mut best = 0;
    for (i, &l) in latency.iter().enumerate() {
        if l > latency[best] {
            best = i;
        }
    }
    best
}

#[inline]
pub(crate) fn sign_extend(imm: u32) -> u64 {
    imm as i32 as i64 as u64
}

#[inline]
pub(crate) fn mulh(a: u64, b: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) >> 64) as u64
}

#[inline]
pub(crate) fn smulh(a: u64, b: u64) -> u64 {
    ((i128::from(a as i64) * i128::from(b as i64)) >> 64) as u64
}

/// floor(2^x / divisor) for the largest x keeping the result in 64 bits.
/// `divisor` must be neither zero nor a power of two.
pub(crate) fn reciprocal(divisor: u32) -> u64 {
    const P2EXP63: u64 = 1 << 63;
    let divisor = u64::from(divisor);
    let mut quotient = P2EXP63 / divisor;
    let mut remainder = P2EXP63 % divisor;
    let bits = 64 - divisor.leading_zeros();
    for _ in 0..bits {
        if remainder >= divisor - remainder {
            quotient = quotient.wrapping_mul(2).wrapping_add(1);
            remainder = remainder.wrapping_mul(2).wrapping_sub(divisor);
        } else {
            quotient = quotient.wrapping_mul(2);
            remainder = remainder.wrapping_mul(2);
        }
    }
    quotient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reciprocal_values() {
        assert_eq!(reciprocal(3), 12297829382473034410);
        assert_eq!(reciprocal(13), 11351842506898185609);
        assert_eq!(reciprocal(33), 17887751829051686415);
        assert_eq!(reciprocal(65537), 18446462603027742720);
        assert_eq!(reciprocal(15000001), 10316166306300415204);
        assert_eq!(reciprocal(3845182035), 10302264209224146340);
        assert_eq!(reciprocal(0xffff_ffff), 9223372039002259456);
    }

    #[test]
    fn test_high_multiplies() {
        assert_eq!(mulh(u64::MAX, u64::MAX), u64::MAX - 1);
        assert_eq!(smulh(u64::MAX, u64::MAX), 0);
        assert_eq!(smulh(i64::MIN as u64, 2), u64::MAX);
        assert_eq!(sign_extend(0x8000_0000), 0xffff_ffff_8000_0000);
    }

    #[test]
    fn test_generated_programs_fill_the_budget() {
        let expected = [(447, 4), (438, 5), (449, 4), (447, 3), (444, 4), (449, 0), (452, 5), (437, 0)];
        let mut rng = Blake2Generator::new(b"test key 000", 0);
        for (len, address) in expected {
            let program = SuperscalarProgram::generate(&mut rng);
            assert_eq!(program.len(), len);
            assert_eq!(program.address_register(), address);
            assert!(program.code.iter().filter(|i| i.op.is_multiplication()).count() > 150);
            assert!(program
                .code
                .iter()
                .all(|i| i.op != ScalarOp::IAddRs || i.dst as usize != REGISTER_NEEDS_DISPLACEMENT));
        }
    }

    #[test]
    fn test_address_register_follows_longest_chain() {
        let chain = |dst, src| ScalarInstruction {
            op: ScalarOp::ISubR,
            dst,
            src,
            operand: 0,
        };
        let code = [chain(1, 2), chain(3, 1), chain(3, 4), chain(0, 0)];
        assert_eq!(address_register(&code), 3);
    }
}
