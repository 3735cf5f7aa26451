pub mod breakout_detector;
