//! Localized user-facing strings.
//!
//! Server-supplied `error`/`detail` messages always win; these are the
//! fallbacks shown when a response carries no message of its own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Th,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    LoadProfileFailed,
    LoadFriendsFailed,
    LoadRequestsFailed,
    UnfriendFailed,
    AcceptFailed,
    DeclineFailed,
    RequestAccepted,
    SessionExpired,
    Loading,
    LoadingRequests,
    NoMatchingFriends,
    NoRequests,
    AddFriendsPlaceholder,
}

impl Message {
    pub fn text(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.en(),
            Locale::Th => self.th(),
        }
    }

    fn en(self) -> &'static str {
        match self {
            Message::LoadProfileFailed => "Could not load your profile",
            Message::LoadFriendsFailed => "Could not load your friends",
            Message::LoadRequestsFailed => "Could not load friend requests",
            Message::UnfriendFailed => "Could not remove friend",
            Message::AcceptFailed => "Could not accept the request",
            Message::DeclineFailed => "Could not decline the request",
            Message::RequestAccepted => "Friend request accepted",
            Message::SessionExpired => "Your session has expired, please log in again",
            Message::Loading => "Loading...",
            Message::LoadingRequests => "Loading requests...",
            Message::NoMatchingFriends => "No friends match your search",
            Message::NoRequests => "No incoming requests yet",
            Message::AddFriendsPlaceholder => "Find and add friends",
        }
    }

    fn th(self) -> &'static str {
        match self {
            Message::LoadProfileFailed => "โหลดโปรไฟล์ไม่สำเร็จ",
            Message::LoadFriendsFailed => "โหลดรายชื่อเพื่อนไม่สำเร็จ",
            Message::LoadRequestsFailed => "โหลดคำขอเป็นเพื่อนไม่สำเร็จ",
            Message::UnfriendFailed => "ลบเพื่อนไม่สำเร็จ",
            Message::AcceptFailed => "ยอมรับคำขอไม่สำเร็จ",
            Message::DeclineFailed => "ปฏิเสธคำขอไม่สำเร็จ",
            Message::RequestAccepted => "ตอบรับคำขอเป็นเพื่อนแล้ว",
            Message::SessionExpired => "เซสชันหมดอายุ กรุณาเข้าสู่ระบบอีกครั้ง",
            Message::Loading => "กำลังโหลด...",
            Message::LoadingRequests => "กำลังโหลดคำขอ...",
            Message::NoMatchingFriends => "ไม่มีเพื่อนที่ตรงกับคำค้น",
            Message::NoRequests => "ยังไม่มีคำขอเข้ามา",
            Message::AddFriendsPlaceholder => "หน้าค้นหา/เพิ่มเพื่อน",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parses_lowercase() {
        let locale: Locale = serde_json::from_str(r#""th""#).expect("valid locale");
        assert_eq!(locale, Locale::Th);
        assert_eq!(Locale::default(), Locale::En);
    }

    #[test]
    fn test_every_message_has_both_locales() {
        for msg in [Message::LoadFriendsFailed, Message::AcceptFailed, Message::NoRequests] {
            assert!(!msg.text(Locale::En).is_empty());
            assert_ne!(msg.text(Locale::En), msg.text(Locale::Th));
        }
    }
}
