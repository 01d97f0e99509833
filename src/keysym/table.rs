//! The static name/code table backing [`super::keysym_from_name`] and
//! [`super::keysym_get_name`]. A subset of the X11 keysym catalog — enough
//! for the letter, digit, punctuation, keypad and function-key ranges that
//! real layouts exercise — plus the Unicode range handled separately in
//! `mod.rs`.
use phf::phf_map;

pub static NAME_TO_CODE: phf::Map<&'static str, u32> = phf_map! {
    "NoSymbol" => 0x0000_0000,
    "VoidSymbol" => 0x00ff_ffff,

    "space" => 0x0020,
    "exclam" => 0x0021,
    "quotedbl" => 0x0022,
    "numbersign" => 0x0023,
    "dollar" => 0x0024,
    "percent" => 0x0025,
    "ampersand" => 0x0026,
    "apostrophe" => 0x0027,
    "parenleft" => 0x0028,
    "parenright" => 0x0029,
    "asterisk" => 0x002a,
    "plus" => 0x002b,
    "comma" => 0x002c,
    "minus" => 0x002d,
    "period" => 0x002e,
    "slash" => 0x002f,
    "0" => 0x0030,
    "1" => 0x0031,
    "2" => 0x0032,
    "3" => 0x0033,
    "4" => 0x0034,
    "5" => 0x0035,
    "6" => 0x0036,
    "7" => 0x0037,
    "8" => 0x0038,
    "9" => 0x0039,
    "colon" => 0x003a,
    "semicolon" => 0x003b,
    "less" => 0x003c,
    "equal" => 0x003d,
    "greater" => 0x003e,
    "question" => 0x003f,
    "at" => 0x0040,
    "A" => 0x0041,
    "B" => 0x0042,
    "C" => 0x0043,
    "D" => 0x0044,
    "E" => 0x0045,
    "F" => 0x0046,
    "G" => 0x0047,
    "H" => 0x0048,
    "I" => 0x0049,
    "J" => 0x004a,
    "K" => 0x004b,
    "L" => 0x004c,
    "M" => 0x004d,
    "N" => 0x004e,
    "O" => 0x004f,
    "P" => 0x0050,
    "Q" => 0x0051,
    "R" => 0x0052,
    "S" => 0x0053,
    "T" => 0x0054,
    "U" => 0x0055,
    "V" => 0x0056,
    "W" => 0x0057,
    "X" => 0x0058,
    "Y" => 0x0059,
    "Z" => 0x005a,
    "bracketleft" => 0x005b,
    "backslash" => 0x005c,
    "bracketright" => 0x005d,
    "asciicircum" => 0x005e,
    "underscore" => 0x005f,
    "grave" => 0x0060,
    "a" => 0x0061,
    "b" => 0x0062,
    "c" => 0x0063,
    "d" => 0x0064,
    "e" => 0x0065,
    "f" => 0x0066,
    "g" => 0x0067,
    "h" => 0x0068,
    "i" => 0x0069,
    "j" => 0x006a,
    "k" => 0x006b,
    "l" => 0x006c,
    "m" => 0x006d,
    "n" => 0x006e,
    "o" => 0x006f,
    "p" => 0x0070,
    "q" => 0x0071,
    "r" => 0x0072,
    "s" => 0x0073,
    "t" => 0x0074,
    "u" => 0x0075,
    "v" => 0x0076,
    "w" => 0x0077,
    "x" => 0x0078,
    "y" => 0x0079,
    "z" => 0x007a,
    "braceleft" => 0x007b,
    "bar" => 0x007c,
    "braceright" => 0x007d,
    "asciitilde" => 0x007e,

    "adiaeresis" => 0x00e4,
    "Adiaeresis" => 0x00c4,
    "odiaeresis" => 0x00f6,
    "Odiaeresis" => 0x00d6,
    "udiaeresis" => 0x00fc,
    "Udiaeresis" => 0x00dc,
    "ssharp" => 0x00df,

    "Escape" => 0xff1b,
    "Return" => 0xff0d,
    "Tab" => 0xff09,
    "BackSpace" => 0xff08,
    "Delete" => 0xffff,
    "Home" => 0xff50,
    "End" => 0xff57,
    "Prior" => 0xff55,
    "Next" => 0xff56,
    "Left" => 0xff51,
    "Up" => 0xff52,
    "Right" => 0xff53,
    "Down" => 0xff54,
    "Insert" => 0xff63,
    "Caps_Lock" => 0xffe5,
    "Num_Lock" => 0xff7f,
    "Scroll_Lock" => 0xff14,

    "Shift_L" => 0xffe1,
    "Shift_R" => 0xffe2,
    "Control_L" => 0xffe3,
    "Control_R" => 0xffe4,
    "Alt_L" => 0xffe9,
    "Alt_R" => 0xffea,
    "Meta_L" => 0xffe7,
    "Meta_R" => 0xffe8,
    "Super_L" => 0xffeb,
    "Super_R" => 0xffec,
    "ISO_Level3_Shift" => 0xfe03,
    "Mode_switch" => 0xff7e,

    "F1" => 0xffbe,
    "F2" => 0xffbf,
    "F3" => 0xffc0,
    "F4" => 0xffc1,
    "F5" => 0xffc2,
    "F6" => 0xffc3,
    "F7" => 0xffc4,
    "F8" => 0xffc5,
    "F9" => 0xffc6,
    "F10" => 0xffc7,
    "F11" => 0xffc8,
    "F12" => 0xffc9,

    "KP_0" => 0xffb0,
    "KP_1" => 0xffb1,
    "KP_2" => 0xffb2,
    "KP_3" => 0xffb3,
    "KP_4" => 0xffb4,
    "KP_5" => 0xffb5,
    "KP_6" => 0xffb6,
    "KP_7" => 0xffb7,
    "KP_8" => 0xffb8,
    "KP_9" => 0xffb9,
    "KP_Add" => 0xffab,
    "KP_Subtract" => 0xffad,
    "KP_Multiply" => 0xffaa,
    "KP_Divide" => 0xffaf,
    "KP_Enter" => 0xff8d,
    "KP_Decimal" => 0xffae,
};

/// Case-fold pairs for the letters the state machine's Caps Lock handling
/// needs (spec §4.6 "Case-folding uses a small table of symbol-pair
/// conversions"). Built from the same literal table above rather than a
/// separate reverse map, since only the ASCII + Latin-1 letters the table
/// defines need folding.
pub static UPPER_TO_LOWER: &[(u32, u32)] = &[
    (0x0041, 0x0061),
    (0x0042, 0x0062),
    (0x0043, 0x0063),
    (0x0044, 0x0064),
    (0x0045, 0x0065),
    (0x0046, 0x0066),
    (0x0047, 0x0067),
    (0x0048, 0x0068),
    (0x0049, 0x0069),
    (0x004a, 0x006a),
    (0x004b, 0x006b),
    (0x004c, 0x006c),
    (0x004d, 0x006d),
    (0x004e, 0x006e),
    (0x004f, 0x006f),
    (0x0050, 0x0070),
    (0x0051, 0x0071),
    (0x0052, 0x0072),
    (0x0053, 0x0073),
    (0x0054, 0x0074),
    (0x0055, 0x0075),
    (0x0056, 0x0076),
    (0x0057, 0x0077),
    (0x0058, 0x0078),
    (0x0059, 0x0079),
    (0x005a, 0x007a),
    (0x00c4, 0x00e4),
    (0x00d6, 0x00f6),
    (0x00dc, 0x00fc),
];
