//! Emoji shortcode table, shared by the `:code:` scanner pass and emoji
//! autocomplete.

use std::collections::HashMap;
use std::sync::LazyLock;

/// `(shortcode, glyph)` in display order.
pub const EMOJI: &[(&str, &str)] = &[
    ("smile", "😄"),
    ("smiley", "😃"),
    ("grin", "😁"),
    ("joy", "😂"),
    ("laughing", "😆"),
    ("wink", "😉"),
    ("blush", "😊"),
    ("slightly_smiling_face", "🙂"),
    ("upside_down_face", "🙃"),
    ("heart_eyes", "😍"),
    ("kissing_heart", "😘"),
    ("thinking", "🤔"),
    ("neutral_face", "😐"),
    ("expressionless", "😑"),
    ("unamused", "😒"),
    ("roll_eyes", "🙄"),
    ("grimacing", "😬"),
    ("relieved", "😌"),
    ("pensive", "😔"),
    ("sleepy", "😪"),
    ("sleeping", "😴"),
    ("mask", "😷"),
    ("nerd_face", "🤓"),
    ("sunglasses", "😎"),
    ("confused", "😕"),
    ("worried", "😟"),
    ("open_mouth", "😮"),
    ("astonished", "😲"),
    ("flushed", "😳"),
    ("cry", "😢"),
    ("sob", "😭"),
    ("scream", "😱"),
    ("angry", "😠"),
    ("rage", "😡"),
    ("skull", "💀"),
    ("poop", "💩"),
    ("clown_face", "🤡"),
    ("ghost", "👻"),
    ("alien", "👽"),
    ("robot", "🤖"),
    ("wave", "👋"),
    ("ok_hand", "👌"),
    ("v", "✌️"),
    ("crossed_fingers", "🤞"),
    ("point_right", "👉"),
    ("point_left", "👈"),
    ("point_up", "☝️"),
    ("point_down", "👇"),
    ("thumbsup", "👍"),
    ("+1", "👍"),
    ("thumbsdown", "👎"),
    ("-1", "👎"),
    ("clap", "👏"),
    ("raised_hands", "🙌"),
    ("pray", "🙏"),
    ("muscle", "💪"),
    ("eyes", "👀"),
    ("brain", "🧠"),
    ("heart", "❤️"),
    ("orange_heart", "🧡"),
    ("yellow_heart", "💛"),
    ("green_heart", "💚"),
    ("blue_heart", "💙"),
    ("purple_heart", "💜"),
    ("black_heart", "🖤"),
    ("broken_heart", "💔"),
    ("sparkles", "✨"),
    ("star", "⭐"),
    ("star2", "🌟"),
    ("fire", "🔥"),
    ("boom", "💥"),
    ("zap", "⚡"),
    ("100", "💯"),
    ("tada", "🎉"),
    ("confetti_ball", "🎊"),
    ("gift", "🎁"),
    ("trophy", "🏆"),
    ("medal", "🏅"),
    ("rocket", "🚀"),
    ("airplane", "✈️"),
    ("car", "🚗"),
    ("bike", "🚲"),
    ("house", "🏠"),
    ("sunny", "☀️"),
    ("cloud", "☁️"),
    ("umbrella", "☔"),
    ("snowflake", "❄️"),
    ("rainbow", "🌈"),
    ("moon", "🌙"),
    ("earth_americas", "🌎"),
    ("seedling", "🌱"),
    ("evergreen_tree", "🌲"),
    ("cactus", "🌵"),
    ("rose", "🌹"),
    ("sunflower", "🌻"),
    ("cat", "🐱"),
    ("dog", "🐶"),
    ("fox_face", "🦊"),
    ("bear", "🐻"),
    ("panda_face", "🐼"),
    ("crab", "🦀"),
    ("butterfly", "🦋"),
    ("bug", "🐛"),
    ("bee", "🐝"),
    ("apple", "🍎"),
    ("banana", "🍌"),
    ("avocado", "🥑"),
    ("pizza", "🍕"),
    ("hamburger", "🍔"),
    ("taco", "🌮"),
    ("cake", "🍰"),
    ("cookie", "🍪"),
    ("coffee", "☕"),
    ("tea", "🍵"),
    ("beer", "🍺"),
    ("wine_glass", "🍷"),
    ("milk_glass", "🥛"),
    ("egg", "🥚"),
    ("memo", "📝"),
    ("pencil2", "✏️"),
    ("book", "📖"),
    ("books", "📚"),
    ("bookmark", "🔖"),
    ("link", "🔗"),
    ("paperclip", "📎"),
    ("pushpin", "📌"),
    ("calendar", "📅"),
    ("clipboard", "📋"),
    ("file_folder", "📁"),
    ("email", "📧"),
    ("bell", "🔔"),
    ("lock", "🔒"),
    ("unlock", "🔓"),
    ("key", "🔑"),
    ("hammer", "🔨"),
    ("wrench", "🔧"),
    ("gear", "⚙️"),
    ("bulb", "💡"),
    ("mag", "🔍"),
    ("computer", "💻"),
    ("keyboard", "⌨️"),
    ("phone", "☎️"),
    ("iphone", "📱"),
    ("camera", "📷"),
    ("hourglass", "⌛"),
    ("alarm_clock", "⏰"),
    ("moneybag", "💰"),
    ("chart_with_upwards_trend", "📈"),
    ("chart_with_downwards_trend", "📉"),
    ("white_check_mark", "✅"),
    ("heavy_check_mark", "✔️"),
    ("x", "❌"),
    ("warning", "⚠️"),
    ("no_entry", "⛔"),
    ("question", "❓"),
    ("exclamation", "❗"),
    ("information_source", "ℹ️"),
    ("arrow_right", "➡️"),
    ("arrow_left", "⬅️"),
    ("arrow_up", "⬆️"),
    ("arrow_down", "⬇️"),
    ("recycle", "♻️"),
    ("construction", "🚧"),
    ("checkered_flag", "🏁"),
    ("triangular_flag_on_post", "🚩"),
    ("speech_balloon", "💬"),
    ("thought_balloon", "💭"),
    ("zzz", "💤"),
];

static BY_CODE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| EMOJI.iter().copied().collect());

/// Glyph for a shortcode (without colons).
pub fn lookup(code: &str) -> Option<&'static str> {
    BY_CODE.get(code).copied()
}

/// Whether a character may appear inside a shortcode.
pub fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-'
}
