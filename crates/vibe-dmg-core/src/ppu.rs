use crate::address_map::{
    BG_DISPLAY_DATA, OAM, OAM_SIZE, REGS_LCDC_END, REGS_LCDC_START, TILE_SOURCE, VIDEO_RAM,
    VIDEO_RAM_SIZE,
};
use crate::bus::{Bus, Component};
use crate::cpu::{Interrupt, InterruptLine};
use crate::image::{Image, ImageBuilder, ImageLine, ImageLineBuilder};
use crate::memory::Ram;
use crate::register_file::{Bit, Register, RegisterFile};

// Screen resolution used by the DMG LCD
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

// Timing constants per LCD mode in machine cycles
const MODE2_CYCLES: u64 = 20; // OAM scan
const MODE3_CYCLES: u64 = 43; // Pixel transfer
const MODE0_CYCLES: u64 = 51; // HBlank
const LINE_CYCLES: u64 = MODE2_CYCLES + MODE3_CYCLES + MODE0_CYCLES;

// Offsets of each mode inside a visible line
const MODE2_START: u64 = 0;
const MODE3_START: u64 = MODE2_START + MODE2_CYCLES;
const MODE0_START: u64 = MODE3_START + MODE3_CYCLES;

// Number of lines spent in VBlank
const VBLANK_LINES: u64 = 10;

// Tile geometry
const FULL_LINE_TILES: usize = 32;
const VISIBLE_LINE_TILES: usize = 20;
const TILE_BYTES: u16 = 16;

// Window X register is offset by 7 pixels
const WINDOW_X_OFFSET: i32 = 7;

// Sprite limits and OAM coordinate offsets
const TOTAL_SPRITES: usize = 40;
const MAX_SPRITES_PER_LINE: usize = 10;
const SPRITE_X_OFFSET: i32 = 8;
const SPRITE_Y_OFFSET: i32 = 16;

// Sprite attribute bits
const ATTR_PALETTE: u8 = 0x10;
const ATTR_FLIP_H: u8 = 0x20;
const ATTR_FLIP_V: u8 = 0x40;
const ATTR_BEHIND_BG: u8 = 0x80;

// LCD modes used in the STAT mode field
const MODE_HBLANK: u8 = 0;
const MODE_VBLANK: u8 = 1;
const MODE_OAM: u8 = 2;
const MODE_TRANSFER: u8 = 3;

/// LCD registers, in address order from 0xFF40.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdReg {
    Lcdc,
    Stat,
    Scy,
    Scx,
    Ly,
    Lyc,
    Dma,
    Bgp,
    Obp0,
    Obp1,
    Wy,
    Wx,
}

impl LcdReg {
    const ALL: [LcdReg; 12] = [
        LcdReg::Lcdc,
        LcdReg::Stat,
        LcdReg::Scy,
        LcdReg::Scx,
        LcdReg::Ly,
        LcdReg::Lyc,
        LcdReg::Dma,
        LcdReg::Bgp,
        LcdReg::Obp0,
        LcdReg::Obp1,
        LcdReg::Wy,
        LcdReg::Wx,
    ];

    fn at(addr: u16) -> Self {
        Self::ALL[usize::from(addr - REGS_LCDC_START)]
    }
}

impl Register for LcdReg {
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy)]
enum Lcdc {
    Bg,
    Obj,
    ObjSize,
    BgArea,
    TileSource,
    Win,
    WinArea,
    LcdOn,
}

impl Bit for Lcdc {
    fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy)]
enum Stat {
    LycEqLy = 2,
    IntMode0,
    IntMode1,
    IntMode2,
    IntLyc,
}

impl Bit for Stat {
    fn index(self) -> u8 {
        self as u8
    }
}

// Mode bits and LY==LYC are read-only
const STAT_MODE_MASK: u8 = 0x03;
const STAT_WRITABLE_MASK: u8 = 0xF8;
const STAT_MODE_INTERRUPTS: [Stat; 3] = [Stat::IntMode0, Stat::IntMode1, Stat::IntMode2];

pub struct Ppu {
    vram: Ram,
    oam: Ram,
    regs: RegisterFile<LcdReg, 12>,

    dma_src: u16,
    dma_dst: u16,

    next_non_idle_cycle: u64,
    lcd_on_cycle: u64,
    current_image: Image,
    next_image: ImageBuilder,
    /// Internal window line counter
    win_y: usize,

    irq: InterruptLine,
}

impl Ppu {
    /// Cycles per full frame, vblank included.
    pub const FRAME_CYCLES: u64 = (SCREEN_HEIGHT as u64 + VBLANK_LINES) * LINE_CYCLES;

    pub fn new(irq: InterruptLine) -> Self {
        Self {
            vram: Ram::new(VIDEO_RAM_SIZE),
            oam: Ram::new(OAM_SIZE),
            regs: RegisterFile::new(),
            dma_src: 0,
            dma_dst: OAM.end,
            next_non_idle_cycle: u64::MAX,
            lcd_on_cycle: 0,
            current_image: ImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT).build(),
            next_image: ImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT),
            win_y: 0,
            irq,
        }
    }

    /// Last frame completed at the start of vblank.
    pub fn current_image(&self) -> &Image {
        &self.current_image
    }

    pub fn reg(&self, reg: LcdReg) -> u8 {
        self.regs.get(reg)
    }

    pub fn mode(&self) -> u8 {
        self.regs.get(LcdReg::Stat) & STAT_MODE_MASK
    }

    pub fn dma_active(&self) -> bool {
        self.dma_dst < OAM.end
    }

    fn lcd_on(&self) -> bool {
        self.regs.test_bit(LcdReg::Lcdc, Lcdc::LcdOn)
    }

    /// Run the LCD controller for global tick `cycle`.
    pub fn cycle(&mut self, cycle: u64, bus: &mut Bus<'_, '_>) {
        debug_assert!(cycle <= self.next_non_idle_cycle);

        if self.dma_active() {
            let v = bus.read_as(self, self.dma_src);
            self.oam.write(usize::from(self.dma_dst - OAM.start), v);
            self.dma_src = self.dma_src.wrapping_add(1);
            self.dma_dst += 1;
        }

        if cycle == self.next_non_idle_cycle {
            self.really_cycle(cycle);
        } else if self.next_non_idle_cycle == u64::MAX && self.lcd_on() {
            log::debug!("LCD on at cycle {cycle}");
            self.lcd_on_cycle = cycle;
            self.next_non_idle_cycle = cycle;
            self.really_cycle(cycle);
        }
    }

    fn really_cycle(&mut self, cycle: u64) {
        let frame_cycle = (cycle - self.lcd_on_cycle) % Self::FRAME_CYCLES;
        let line = (frame_cycle / LINE_CYCLES) as usize;
        let line_cycle = frame_cycle % LINE_CYCLES;

        if frame_cycle == 0 {
            self.next_image = ImageBuilder::new(SCREEN_WIDTH, SCREEN_HEIGHT);
            self.win_y = 0;
        }

        if line < SCREEN_HEIGHT {
            match line_cycle {
                MODE2_START => {
                    self.set_ly_or_lyc(LcdReg::Ly, line as u8);
                    self.set_mode(MODE_OAM);
                    self.next_non_idle_cycle += MODE2_CYCLES;
                }
                MODE3_START => {
                    self.set_mode(MODE_TRANSFER);
                    let computed = self.compute_line(line);
                    self.next_image.set_line(line, computed);
                    self.next_non_idle_cycle += MODE3_CYCLES;
                }
                MODE0_START => {
                    self.set_mode(MODE_HBLANK);
                    self.next_non_idle_cycle += MODE0_CYCLES;
                }
                _ => unreachable!("LCD woke at line cycle {line_cycle}"),
            }
        } else {
            debug_assert_eq!(line_cycle, 0);
            if line == SCREEN_HEIGHT {
                self.current_image = self.next_image.build();
                self.set_mode(MODE_VBLANK);
                self.irq.request(Interrupt::VBlank);
            }
            self.set_ly_or_lyc(LcdReg::Ly, line as u8);
            self.next_non_idle_cycle += LINE_CYCLES;
        }
    }

    fn set_mode(&mut self, mode: u8) {
        let stat = self.regs.get(LcdReg::Stat);
        self.regs.set(LcdReg::Stat, (stat & !STAT_MODE_MASK) | mode);
        if let Some(&bit) = STAT_MODE_INTERRUPTS.get(usize::from(mode)) {
            if self.regs.test_bit(LcdReg::Stat, bit) {
                self.irq.request(Interrupt::LcdStat);
            }
        }
    }

    fn set_ly_or_lyc(&mut self, reg: LcdReg, value: u8) {
        debug_assert!(matches!(reg, LcdReg::Ly | LcdReg::Lyc));
        self.regs.set(reg, value);
        let equal = self.regs.get(LcdReg::Ly) == self.regs.get(LcdReg::Lyc);
        self.regs.set_bit(LcdReg::Stat, Stat::LycEqLy, equal);
        if equal && self.regs.test_bit(LcdReg::Stat, Stat::IntLyc) {
            self.irq.request(Interrupt::LcdStat);
        }
    }

    fn compute_line(&mut self, y: usize) -> ImageLine {
        let mut line = ImageLine::empty(SCREEN_WIDTH);

        if self.regs.test_bit(LcdReg::Lcdc, Lcdc::Bg) {
            let bg_y = (usize::from(self.regs.get(LcdReg::Scy)) + y) & 0xFF;
            line = self
                .tile_line(Lcdc::BgArea, FULL_LINE_TILES, bg_y)
                .extract_wrapped(i32::from(self.regs.get(LcdReg::Scx)), SCREEN_WIDTH)
                .map_colors(self.regs.get(LcdReg::Bgp));
        }

        let win_x = (i32::from(self.regs.get(LcdReg::Wx)) - WINDOW_X_OFFSET).max(0) as usize;
        if self.regs.test_bit(LcdReg::Lcdc, Lcdc::Win)
            && win_x < SCREEN_WIDTH
            && usize::from(self.regs.get(LcdReg::Wy)) <= y
        {
            let window = self
                .tile_line(Lcdc::WinArea, VISIBLE_LINE_TILES, self.win_y)
                .map_colors(self.regs.get(LcdReg::Bgp));
            line = line.join(&window.shift(win_x as i32), win_x);
            self.win_y += 1;
        }

        if self.regs.test_bit(LcdReg::Lcdc, Lcdc::Obj) {
            let sprites = self.sprites_on_line(y);
            let behind = self.sprite_line(&sprites, y, true);
            let front = self.sprite_line(&sprites, y, false);
            let opacity = line.opacity() | &!behind.opacity();
            line = behind.below_with(&line, &opacity).below(&front);
        }

        line
    }

    /// One row of pixels of a background or window tile map, `tiles` wide.
    fn tile_line(&self, area: Lcdc, tiles: usize, y: usize) -> ImageLine {
        let map_base = BG_DISPLAY_DATA[usize::from(self.regs.test_bit(LcdReg::Lcdc, area))];
        let unsigned_tiles = self.regs.test_bit(LcdReg::Lcdc, Lcdc::TileSource);
        let data_base = TILE_SOURCE[usize::from(unsigned_tiles)];
        let tile_y = (y >> 3) & 0x1F;
        let row = (y & 0x07) as u16;

        let mut builder = ImageLineBuilder::new(tiles * 8);
        for tile_x in 0..tiles {
            let map_addr = map_base + (FULL_LINE_TILES * tile_y + tile_x) as u16;
            let mut tile = self.vram_at(map_addr);
            if !unsigned_tiles {
                tile = tile.wrapping_add(0x80);
            }
            builder.set_bytes(
                tile_x,
                self.tile_byte(data_base, tile, row, true).reverse_bits(),
                self.tile_byte(data_base, tile, row, false).reverse_bits(),
            );
        }
        builder.build()
    }

    /// OAM indices of the first ten sprites covering line `y`, in priority
    /// order (lowest x first, ties by index).
    fn sprites_on_line(&self, y: usize) -> Vec<usize> {
        let height = self.sprite_height();
        let y = y as i32;
        let mut found: Vec<(u8, usize)> = (0..TOTAL_SPRITES)
            .filter(|&i| {
                let top = i32::from(self.sprite_byte(i, 0)) - SPRITE_Y_OFFSET;
                top <= y && y < top + height
            })
            .take(MAX_SPRITES_PER_LINE)
            .map(|i| (self.sprite_byte(i, 1), i))
            .collect();
        found.sort_unstable();
        found.into_iter().map(|(_, i)| i).collect()
    }

    /// Sprites of one priority class layered onto a transparent line.
    fn sprite_line(&self, sprites: &[usize], y: usize, behind_bg: bool) -> ImageLine {
        let height = self.sprite_height();
        let mut line = ImageLine::empty(SCREEN_WIDTH);

        // Highest priority last so it ends up on top
        for &id in sprites.iter().rev() {
            let attrs = self.sprite_byte(id, 3);
            if (attrs & ATTR_BEHIND_BG != 0) != behind_bg {
                continue;
            }

            let x = i32::from(self.sprite_byte(id, 1)) - SPRITE_X_OFFSET;
            let top = i32::from(self.sprite_byte(id, 0)) - SPRITE_Y_OFFSET;
            let mut row = y as i32 - top;
            if attrs & ATTR_FLIP_V != 0 {
                row = height - 1 - row;
            }

            let tile = self.sprite_byte(id, 2);
            let mut msb = self.tile_byte(TILE_SOURCE[1], tile, row as u16, true);
            let mut lsb = self.tile_byte(TILE_SOURCE[1], tile, row as u16, false);
            if attrs & ATTR_FLIP_H == 0 {
                msb = msb.reverse_bits();
                lsb = lsb.reverse_bits();
            }
            let palette = if attrs & ATTR_PALETTE != 0 {
                self.regs.get(LcdReg::Obp1)
            } else {
                self.regs.get(LcdReg::Obp0)
            };

            let mut builder = ImageLineBuilder::new(SCREEN_WIDTH);
            builder.set_bytes(0, msb, lsb);
            let sprite = builder.build().shift(x).map_colors(palette);
            line = line.below(&sprite);
        }

        line
    }

    fn sprite_height(&self) -> i32 {
        if self.regs.test_bit(LcdReg::Lcdc, Lcdc::ObjSize) {
            16
        } else {
            8
        }
    }

    fn sprite_byte(&self, id: usize, field: usize) -> u8 {
        self.oam.read(id * 4 + field)
    }

    fn tile_byte(&self, base: u16, tile: u8, row: u16, msb: bool) -> u8 {
        let addr = base + u16::from(tile) * TILE_BYTES + row * 2 + u16::from(msb);
        self.vram_at(addr)
    }

    fn vram_at(&self, addr: u16) -> u8 {
        self.vram.read(usize::from(addr - VIDEO_RAM.start))
    }
}

impl Component for Ppu {
    fn read(&self, addr: u16) -> Option<u8> {
        if VIDEO_RAM.contains(&addr) {
            Some(self.vram_at(addr))
        } else if OAM.contains(&addr) {
            Some(self.oam.read(usize::from(addr - OAM.start)))
        } else if (REGS_LCDC_START..REGS_LCDC_END).contains(&addr) {
            Some(self.regs.get(LcdReg::at(addr)))
        } else {
            None
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        if VIDEO_RAM.contains(&addr) {
            self.vram.write(usize::from(addr - VIDEO_RAM.start), val);
        } else if OAM.contains(&addr) {
            self.oam.write(usize::from(addr - OAM.start), val);
        } else if (REGS_LCDC_START..REGS_LCDC_END).contains(&addr) {
            match LcdReg::at(addr) {
                LcdReg::Lcdc => {
                    let was_on = self.lcd_on();
                    self.regs.set(LcdReg::Lcdc, val);
                    if was_on && !self.lcd_on() {
                        log::debug!("LCD off");
                        self.set_mode(MODE_HBLANK);
                        self.set_ly_or_lyc(LcdReg::Ly, 0);
                        self.next_non_idle_cycle = u64::MAX;
                    }
                }
                LcdReg::Stat => {
                    let stat = self.regs.get(LcdReg::Stat);
                    self.regs.set(
                        LcdReg::Stat,
                        (val & STAT_WRITABLE_MASK) | (stat & !STAT_WRITABLE_MASK),
                    );
                }
                LcdReg::Ly => {}
                LcdReg::Lyc => self.set_ly_or_lyc(LcdReg::Lyc, val),
                LcdReg::Dma => {
                    self.regs.set(LcdReg::Dma, val);
                    self.dma_src = u16::from(val) << 8;
                    self.dma_dst = OAM.start;
                }
                reg => self.regs.set(reg, val),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length() {
        assert_eq!(Ppu::FRAME_CYCLES, 17_556);
    }

    #[test]
    fn stat_mode_bits_are_read_only() {
        let mut ppu = Ppu::new(InterruptLine::new());
        ppu.write(0xFF41, 0xFF);
        assert_eq!(ppu.read(0xFF41), Some(0xF8));
    }

    #[test]
    fn lyc_match_sets_coincidence() {
        let irq = InterruptLine::new();
        let mut ppu = Ppu::new(irq.clone());
        ppu.write(0xFF41, 0x40);
        ppu.write(0xFF45, 0);
        assert_eq!(ppu.read(0xFF41), Some(0x44));
        assert_eq!(irq.get(), 1 << 1);
    }

    #[test]
    fn background_tile_with_signed_addressing() {
        let mut ppu = Ppu::new(InterruptLine::new());
        // tile 0 in signed mode lives at 0x9000; left pixel color 3
        ppu.write(0x9000, 0x80);
        ppu.write(0x9001, 0x80);
        ppu.write(0xFF40, 0x81);
        ppu.write(0xFF47, 0xE4);
        let line = ppu.compute_line(0);
        assert!(line.msb().test_bit(0) && line.lsb().test_bit(0));
        assert!(!line.msb().test_bit(1));
        // the map is all zeros, so the pattern repeats every 8 pixels
        assert!(line.msb().test_bit(8));
    }
}
