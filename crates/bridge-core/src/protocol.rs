//! Message codes, notification codes and fixed-layout records of the engine's
//! direct-message protocol.
//!
//! Only the subset the bridge itself issues or decodes lives here. Codes
//! used purely for cosmetics are the host's business.

use std::ffi::{c_char, c_void};

/*

====================
===== MESSAGES =====
====================

*/

pub const SCI_INSERTTEXT: u32 = 2003;
pub const SCI_CLEARALL: u32 = 2004;
pub const SCI_GETLENGTH: u32 = 2006;
pub const SCI_GETCHARAT: u32 = 2007;
pub const SCI_GETCURRENTPOS: u32 = 2008;
pub const SCI_GETANCHOR: u32 = 2009;
pub const SCI_GOTOPOS: u32 = 2025;
pub const SCI_SETANCHOR: u32 = 2026;
pub const SCI_SETCODEPAGE: u32 = 2037;
pub const SCI_GETTEXTRANGEFULL: u32 = 2039;
pub const SCI_GETLINEENDPOSITION: u32 = 2136;
pub const SCI_GETCODEPAGE: u32 = 2137;
pub const SCI_SETCURRENTPOS: u32 = 2141;
pub const SCI_SETSELECTIONSTART: u32 = 2142;
pub const SCI_GETSELECTIONSTART: u32 = 2143;
pub const SCI_SETSELECTIONEND: u32 = 2144;
pub const SCI_GETSELECTIONEND: u32 = 2145;
pub const SCI_GETLINECOUNT: u32 = 2154;
pub const SCI_SETSEL: u32 = 2160;
pub const SCI_LINEFROMPOSITION: u32 = 2166;
pub const SCI_POSITIONFROMLINE: u32 = 2167;
pub const SCI_SETTEXT: u32 = 2181;
pub const SCI_GETTARGETSTART: u32 = 2191;
pub const SCI_GETTARGETEND: u32 = 2193;
pub const SCI_REPLACETARGET: u32 = 2194;
pub const SCI_APPENDTEXT: u32 = 2282;
pub const SCI_LINELENGTH: u32 = 2350;
pub const SCI_GETDOCPOINTER: u32 = 2357;
pub const SCI_SETDOCPOINTER: u32 = 2358;
pub const SCI_SETMODEVENTMASK: u32 = 2359;
pub const SCI_CREATEDOCUMENT: u32 = 2375;
pub const SCI_ADDREFDOCUMENT: u32 = 2376;
pub const SCI_RELEASEDOCUMENT: u32 = 2377;
pub const SCI_DELETERANGE: u32 = 2645;
pub const SCI_CHANGEINSERTION: u32 = 2672;
pub const SCI_SETTARGETRANGE: u32 = 2686;

pub const SC_CP_UTF8: usize = 65001;

/*

=========================
===== NOTIFICATIONS =====
=========================

*/

pub const SCN_STYLENEEDED: u32 = 2000;
pub const SCN_CHARADDED: u32 = 2001;
pub const SCN_SAVEPOINTREACHED: u32 = 2002;
pub const SCN_SAVEPOINTLEFT: u32 = 2003;
pub const SCN_MODIFYATTEMPTRO: u32 = 2004;
pub const SCN_KEY: u32 = 2005;
pub const SCN_DOUBLECLICK: u32 = 2006;
pub const SCN_UPDATEUI: u32 = 2007;
pub const SCN_MODIFIED: u32 = 2008;
pub const SCN_MACRORECORD: u32 = 2009;
pub const SCN_MARGINCLICK: u32 = 2010;
pub const SCN_NEEDSHOWN: u32 = 2011;
pub const SCN_PAINTED: u32 = 2013;
pub const SCN_USERLISTSELECTION: u32 = 2014;
pub const SCN_URIDROPPED: u32 = 2015;
pub const SCN_DWELLSTART: u32 = 2016;
pub const SCN_DWELLEND: u32 = 2017;
pub const SCN_ZOOM: u32 = 2018;
pub const SCN_HOTSPOTCLICK: u32 = 2019;
pub const SCN_HOTSPOTDOUBLECLICK: u32 = 2020;
pub const SCN_CALLTIPCLICK: u32 = 2021;
pub const SCN_AUTOCSELECTION: u32 = 2022;
pub const SCN_INDICATORCLICK: u32 = 2023;
pub const SCN_INDICATORRELEASE: u32 = 2024;
pub const SCN_AUTOCCANCELLED: u32 = 2025;
pub const SCN_AUTOCCHARDELETED: u32 = 2026;
pub const SCN_HOTSPOTRELEASECLICK: u32 = 2027;
pub const SCN_FOCUSIN: u32 = 2028;
pub const SCN_FOCUSOUT: u32 = 2029;
pub const SCN_AUTOCCOMPLETED: u32 = 2030;
pub const SCN_MARGINRIGHTCLICK: u32 = 2031;
pub const SCN_AUTOCSELECTIONCHANGE: u32 = 2032;

/// Notification codes occupy this range; command codes never do.
pub const SCN_FIRST: u32 = SCN_STYLENEEDED;
pub const SCN_LAST: u32 = SCN_AUTOCSELECTIONCHANGE;

/*

==============================
===== MODIFICATION FLAGS =====
==============================

*/

pub const SC_MOD_INSERTTEXT: i32 = 0x1;
pub const SC_MOD_DELETETEXT: i32 = 0x2;
pub const SC_PERFORMED_USER: i32 = 0x10;
pub const SC_PERFORMED_UNDO: i32 = 0x20;
pub const SC_PERFORMED_REDO: i32 = 0x40;
pub const SC_MOD_BEFOREINSERT: i32 = 0x400;
pub const SC_MOD_BEFOREDELETE: i32 = 0x800;
pub const SC_MOD_CHANGEANNOTATION: i32 = 0x20000;
pub const SC_MOD_INSERTCHECK: i32 = 0x100000;
pub const SC_MODEVENTMASKALL: usize = 0x3F_FFFF;

/*

===================
===== RECORDS =====
===================

*/

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct NotifyHeader {
    pub hwnd_from: *mut c_void,
    pub id_from: usize,
    pub code: u32,
}

/// The record the engine hands to its container for every notification.
///
/// `code` in the header selects which of the other fields are meaningful.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ScNotification {
    pub header: NotifyHeader,
    pub position: isize,
    pub ch: i32,
    pub modifiers: i32,
    pub modification_type: i32,
    pub text: *const c_char,
    pub length: isize,
    pub lines_added: isize,
    pub message: i32,
    pub w_param: usize,
    pub l_param: isize,
    pub line: isize,
    pub fold_level_now: i32,
    pub fold_level_prev: i32,
    pub margin: i32,
    pub list_type: i32,
    pub x: i32,
    pub y: i32,
    pub token: i32,
    pub annotation_lines_added: isize,
    pub updated: i32,
    pub list_completion_method: i32,
}

impl ScNotification {
    /// An all-zero record carrying `code`, for engines that build records field by field.
    #[must_use]
    pub fn with_code(code: u32) -> Self {
        Self {
            header: NotifyHeader {
                hwnd_from: std::ptr::null_mut(),
                id_from: 0,
                code,
            },
            position: 0,
            ch: 0,
            modifiers: 0,
            modification_type: 0,
            text: std::ptr::null(),
            length: 0,
            lines_added: 0,
            message: 0,
            w_param: 0,
            l_param: 0,
            line: 0,
            fold_level_now: 0,
            fold_level_prev: 0,
            margin: 0,
            list_type: 0,
            x: 0,
            y: 0,
            token: 0,
            annotation_lines_added: 0,
            updated: 0,
            list_completion_method: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct CharacterRangeFull {
    pub cp_min: isize,
    pub cp_max: isize,
}

/// Argument of `SCI_GETTEXTRANGEFULL`. `text` must point at a caller-owned
/// buffer of at least `cp_max - cp_min + 1` bytes; the engine NUL-terminates it.
#[repr(C)]
#[derive(Debug)]
pub struct TextRangeFull {
    pub chrg: CharacterRangeFull,
    pub text: *mut c_char,
}
