pub mod form;
pub mod preview_panel;

pub const USAGE_GUIDE: &str = "\
1. Prompt: optional text describing the video.
2. Image path: path to the condition image.
3. Person 1 audio: path to the first speaker's audio.
4. Two speakers: tick to put two people in the video.
5. Person 2 audio: path to the second speaker's audio.
6. Bbox: face region per person as x,y,width,height. Empty fields use the defaults.

Every run gets its own folder under the data directory holding the staged inputs, \
the generated config_<id>.json and the resulting multiperson_<id> video.";
