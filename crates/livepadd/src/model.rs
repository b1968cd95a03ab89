//! The demo application's scriptable state.
//!
//! A stand-in for a real app's UI tree: snippets receive it as the `host`
//! argument, can downcast to mutate it, and can dump any part of it.

use livepad_runtime::reflect_fields;
use livepad_runtime::Bitmap;

pub struct AppModel {
    pub title: String,
    pub build: u32,
    pub counter: i64,
    pub screens: Vec<Screen>,
    pub icon: Bitmap,
}

pub struct Screen {
    pub name: String,
    pub visible: bool,
    pub widgets: Vec<String>,
}

reflect_fields!(AppModel { title, build, counter, screens, icon });
reflect_fields!(Screen { name, visible, widgets });

impl AppModel {
    pub fn sample() -> Self {
        Self {
            title: "LivePad demo app".to_string(),
            build: 42,
            counter: 0,
            screens: vec![
                Screen {
                    name: "home".to_string(),
                    visible: true,
                    widgets: vec!["header".to_string(), "feed".to_string()],
                },
                Screen {
                    name: "settings".to_string(),
                    visible: false,
                    widgets: vec!["toggle-list".to_string()],
                },
            ],
            icon: Bitmap::solid(16, 16, [60, 120, 220]).expect("static dimensions are valid"),
        }
    }
}
